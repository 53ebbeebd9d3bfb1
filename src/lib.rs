pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod exception;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod stream;
pub mod util;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use exception::Exception;
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use resolver::{ResolvedPath, UriResolver};
pub use response::{Body, Response};
pub use server::Server;
pub use stream::{FileStream, LogObserver, TransferObserver};
pub use util::HtmlBuilder;
