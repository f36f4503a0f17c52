//! Structural checks run before an order request reaches the store.

use crate::error::OrderError;
use crate::order::CreateOrder;

/// Validate the shape of an order request.
///
/// Pure function of its input: no store access, no side effects. Rejects a
/// non-positive customer id, an empty line list, and any line with a
/// non-positive product id or quantity (the first offending line is named).
pub fn validate_create_order(request: &CreateOrder) -> Result<(), OrderError> {
    if !request.customer_id.is_valid() {
        return Err(OrderError::invalid("customer_id must be positive"));
    }
    if request.lines.is_empty() {
        return Err(OrderError::invalid("at least one order line is required"));
    }
    for (idx, line) in request.lines.iter().enumerate() {
        if !line.product_id.is_valid() {
            return Err(OrderError::invalid(format!(
                "line {idx}: product_id must be positive"
            )));
        }
        if line.quantity <= 0 {
            return Err(OrderError::invalid(format!(
                "line {idx}: quantity must be positive"
            )));
        }
    }
    Ok(())
}
