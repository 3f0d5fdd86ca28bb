pub mod tenant;
pub mod visit;

pub use tenant::{Tenant, TENANT_HEADER};
pub use visit::{CountResponse, IpInfo, VisitEvent};
