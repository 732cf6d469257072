pub mod camera {
    pub mod domain {
        pub mod camera_source;
        pub mod video_surface;
    }
    pub mod infrastructure;
}

pub mod gallery {
    pub mod domain {
        pub mod identity;
        pub mod image_fetcher;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod overlay_surface;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod camera_acquirer;
    pub mod frame_poller;
    pub mod infrastructure;
    pub mod load_gallery_use_case;
    pub mod pass_logger;
    pub mod recognize_frame_use_case;
    pub mod session;

    #[cfg(test)]
    pub(crate) mod test_stubs;
}

pub mod recognition {
    pub mod domain {
        pub mod descriptor;
        pub mod face_analyzer;
        pub mod face_landmarks;
        pub mod face_matcher;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod retry;
}
