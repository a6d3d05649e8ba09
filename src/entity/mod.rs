pub mod addresses;
pub mod audit_logs;
pub mod categories;
pub mod contents;
pub mod order_items;
pub mod orders;
pub mod product_variants;
pub mod products;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use contents::Entity as Contents;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use users::Entity as Users;
