pub mod base64;
pub mod http;
pub mod string;
pub mod url;
