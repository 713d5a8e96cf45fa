//! HTTP surface shared by the backend server and its clients.
//!
//! Every mutating route answers with the canonical list of open items, so a
//! client can replace its local state wholesale after each call.

use crate::domain::Item;

pub const HEALTHZ_ROUTE: &str = "/healthz";
pub const ITEMS_ROUTE: &str = "/items";
pub const COMPLETE_ITEM_ROUTE: &str = "/items/:item_id/complete";

/// Path segments of the complete route, relative to the server base URL.
pub fn complete_item_segments(item_id: &str) -> [&str; 3] {
    ["items", item_id, "complete"]
}

/// Body of every list-returning route.
pub type CanonicalList = Vec<Item>;
