pub mod default_session_parts;
