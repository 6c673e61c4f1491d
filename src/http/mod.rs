//! Request and response data model.

pub mod request;
pub mod response;

pub use request::{HttpRequest, RequestBuilder};
pub use response::{HttpResponse, ResponseBody};
