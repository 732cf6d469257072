pub mod arcface_embedder;
pub mod model_loader;
pub mod onnx_face_analyzer;
pub mod onnx_face_detector;
pub mod onnx_session;
