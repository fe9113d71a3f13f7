//! HTTP request DTOs.
//!
//! The order submission body is [`CreateOrderRequest`]; only the query types
//! specific to this adapter live here.
//!
//! [`CreateOrderRequest`]: crate::application::dto::CreateOrderRequest

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderStatus;

/// Query string of `GET /api/orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// Optional status filter.
    #[serde(default)]
    pub status: Option<String>,
}

impl ListOrdersQuery {
    /// Parse the status filter. A blank filter means no filter.
    ///
    /// # Errors
    ///
    /// Returns the raw value if it names no known status.
    pub fn status_filter(&self) -> Result<Option<OrderStatus>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => OrderStatus::parse(raw)
                .map(Some)
                .ok_or_else(|| raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parsing() {
        let query = |s: Option<&str>| ListOrdersQuery {
            status: s.map(ToString::to_string),
        };
        assert_eq!(query(None).status_filter(), Ok(None));
        assert_eq!(query(Some(" ")).status_filter(), Ok(None));
        assert_eq!(
            query(Some("confirmed")).status_filter(),
            Ok(Some(OrderStatus::Confirmed))
        );
        assert_eq!(query(Some("done")).status_filter(), Err("done".to_string()));
    }
}
