pub mod api_path;
pub mod current_user;
pub mod request_id;

pub use api_path::ApiPath;
pub use current_user::CurrentUser;
pub use request_id::RequestId;
