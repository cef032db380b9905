pub mod audit_logs;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod transactions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
