//! Aggregates module

use thiserror::Error;

/// Stored text value that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownValue { pub kind: &'static str, pub value: String }

/// `as_str`, `FromStr` and `Display` for enums persisted as text.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str { match self { $(Self::$variant => $text),+ } }
        }
        impl std::str::FromStr for $ty {
            type Err = $crate::domain::aggregates::UnknownValue;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::domain::aggregates::UnknownValue { kind: stringify!($ty), value: other.to_string() }),
                }
            }
        }
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

pub mod product;
pub mod cart;
pub mod coupon;
pub mod dealer;
pub mod delivery;
pub mod order;

pub use product::{Product, ProductAttrs, ProductError};
pub use cart::{Cart, CartError, CartItem};
pub use coupon::{Coupon, CouponError, DiscountType};
pub use dealer::{ApprovalStatus, Dealer, DealerError};
pub use delivery::{Delivery, DeliveryError, DeliveryStatus};
pub use order::{DeliveryMethod, Order, OrderError, OrderStatus, PaymentMode};
