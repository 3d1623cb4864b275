pub mod audit_logs;
pub mod cart_lines;
pub mod customers;
pub mod items;
pub mod order_lines;
pub mod orders;
pub mod payments;

pub use audit_logs::Entity as AuditLogs;
pub use cart_lines::Entity as CartLines;
pub use customers::Entity as Customers;
pub use items::Entity as Items;
pub use order_lines::Entity as OrderLines;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
