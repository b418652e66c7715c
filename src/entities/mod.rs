pub mod address;
pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod product;

pub use address::Entity as Address;
pub use cart_item::Entity as CartItem;
pub use coupon::Entity as Coupon;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
