pub mod audit;
pub mod dispatcher;
pub mod init;
pub mod macros;
pub mod model;
pub mod sink;

pub use audit::*;
pub use dispatcher::*;
pub use init::*;
pub use model::*;
pub use sink::*;
