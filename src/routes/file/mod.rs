mod handler;

pub use handler::download;
