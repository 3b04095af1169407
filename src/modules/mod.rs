pub mod conversation {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_http;
}

pub mod message {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_http;
}

pub mod file_upload;

pub mod store {
    pub mod state;
    pub mod events;
    pub mod actor;
}

pub mod realtime;

pub mod chat {
    pub mod service;
}
