pub mod category;
pub mod embedded;
pub mod menu_item;
pub mod order;
pub mod restaurant;
pub mod user;

pub use category::{Category, CategoryForm};
pub use menu_item::{CategoryRef, MenuItem, MenuItemForm};
pub use order::{CustomerRef, Order, OrderFilter, OrderItem, OrderStatus, PaymentReview, PaymentStatus, StatusUpdate};
pub use restaurant::{Restaurant, RestaurantForm, SubscriptionStatus};
pub use user::{NewUser, RestaurantRef, Role, RoleUpdate, User};

/// Form text fields arrive as possibly-empty strings; blank means absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
