use std::collections::HashMap;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::PlaceOrderError;
use super::order::{NewOrderLine, OrderLineRequest, Product, QuantityUpdate};

/// Stock to take from one product for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: Uuid,
    pub price: BigDecimal,
    pub available: i32,
    pub requested: i32,
}

impl Reservation {
    pub fn remaining(&self) -> i32 {
        self.available - self.requested
    }

    pub fn order_line(&self) -> NewOrderLine {
        NewOrderLine {
            product_id: self.product_id,
            price: self.price.clone(),
            quantity: self.requested,
        }
    }

    pub fn quantity_update(&self) -> QuantityUpdate {
        QuantityUpdate {
            product_id: self.product_id,
            quantity: self.remaining(),
        }
    }
}

/// Merges repeated product ids into a single request at the position of
/// their first occurrence, summing quantities.
///
/// Fails on the first non-positive quantity in request order.
pub fn coalesce(requested: &[OrderLineRequest]) -> Result<Vec<OrderLineRequest>, PlaceOrderError> {
    let mut merged: Vec<OrderLineRequest> = Vec::with_capacity(requested.len());
    let mut position: HashMap<Uuid, usize> = HashMap::with_capacity(requested.len());

    for line in requested {
        if line.quantity <= 0 {
            return Err(PlaceOrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        match position.get(&line.product_id) {
            Some(&idx) => {
                merged[idx].quantity = merged[idx].quantity.saturating_add(line.quantity);
            }
            None => {
                position.insert(line.product_id, merged.len());
                merged.push(*line);
            }
        }
    }

    Ok(merged)
}

/// Checks a coalesced request against a product snapshot.
///
/// Every product must exist before any availability is looked at, and both
/// checks report the first offender in request order. The result follows the
/// request order too, whatever order `products` came back in. The function is
/// pure: the same request and snapshot always give the same answer.
pub fn plan_reservation(
    requested: &[OrderLineRequest],
    products: &[Product],
) -> Result<Vec<Reservation>, PlaceOrderError> {
    if products.is_empty() {
        return Err(PlaceOrderError::NoProductsFound);
    }

    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    if let Some(missing) = requested.iter().find(|l| !by_id.contains_key(&l.product_id)) {
        return Err(PlaceOrderError::ProductNotFound(missing.product_id));
    }

    requested
        .iter()
        .map(|line| {
            let product = by_id[&line.product_id];
            if line.quantity > product.quantity {
                return Err(PlaceOrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                });
            }
            Ok(Reservation {
                product_id: product.id,
                price: product.price.clone(),
                available: product.quantity,
                requested: line.quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(name: &str, price: &str, quantity: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity,
        }
    }

    #[test]
    fn coalesce_sums_duplicates_at_first_position() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = coalesce(&[
            OrderLineRequest::new(a, 1),
            OrderLineRequest::new(b, 2),
            OrderLineRequest::new(a, 3),
        ])
        .expect("valid request");

        assert_eq!(
            merged,
            vec![OrderLineRequest::new(a, 4), OrderLineRequest::new(b, 2)]
        );
    }

    #[test]
    fn coalesce_rejects_first_non_positive_quantity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let err = coalesce(&[
            OrderLineRequest::new(a, 1),
            OrderLineRequest::new(b, 0),
            OrderLineRequest::new(a, -2),
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            PlaceOrderError::InvalidQuantity { product_id, quantity: 0 } if product_id == b
        ));
    }

    #[test]
    fn empty_snapshot_is_no_products_found() {
        let err = plan_reservation(&[OrderLineRequest::new(Uuid::new_v4(), 1)], &[]).unwrap_err();
        assert!(matches!(err, PlaceOrderError::NoProductsFound));
    }

    #[test]
    fn reports_first_missing_product_in_request_order() {
        let a = product("A", "10.00", 5);
        let missing_first = Uuid::new_v4();
        let missing_second = Uuid::new_v4();

        let err = plan_reservation(
            &[
                OrderLineRequest::new(a.id, 1),
                OrderLineRequest::new(missing_first, 1),
                OrderLineRequest::new(missing_second, 1),
            ],
            &[a],
        )
        .unwrap_err();

        assert!(matches!(err, PlaceOrderError::ProductNotFound(id) if id == missing_first));
    }

    #[test]
    fn existence_is_checked_before_availability() {
        let a = product("A", "10.00", 5);
        let missing = Uuid::new_v4();

        let err = plan_reservation(
            &[
                OrderLineRequest::new(a.id, 99),
                OrderLineRequest::new(missing, 1),
            ],
            &[a],
        )
        .unwrap_err();

        assert!(matches!(err, PlaceOrderError::ProductNotFound(id) if id == missing));
    }

    #[test]
    fn reports_first_short_line_in_request_order() {
        let a = product("A", "10.00", 5);
        let b = product("B", "3.00", 2);
        let c = product("C", "1.00", 0);

        let err = plan_reservation(
            &[
                OrderLineRequest::new(a.id, 5),
                OrderLineRequest::new(b.id, 3),
                OrderLineRequest::new(c.id, 1),
            ],
            &[c.clone(), b.clone(), a.clone()],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock { product_id, requested: 3 } if product_id == b.id
        ));
    }

    #[test]
    fn plan_follows_request_order_and_snapshots_price() {
        let a = product("A", "10.00", 5);
        let b = product("B", "3.00", 2);

        let plan = plan_reservation(
            &[OrderLineRequest::new(a.id, 3), OrderLineRequest::new(b.id, 1)],
            &[b.clone(), a.clone()],
        )
        .expect("valid plan");

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].product_id, a.id);
        assert_eq!(plan[0].price, a.price);
        assert_eq!(plan[0].quantity_update().quantity, 2);
        assert_eq!(plan[1].product_id, b.id);
        assert_eq!(plan[1].order_line().quantity, 1);
        assert_eq!(plan[1].remaining(), 1);
    }

    #[test]
    fn requesting_exactly_the_stock_leaves_zero() {
        let a = product("A", "10.00", 5);
        let plan = plan_reservation(&[OrderLineRequest::new(a.id, 5)], &[a]).expect("valid plan");
        assert_eq!(plan[0].remaining(), 0);
    }

    #[test]
    fn same_snapshot_gives_same_decision() {
        let a = product("A", "10.00", 5);
        let accepted = [OrderLineRequest::new(a.id, 4)];
        let rejected = [OrderLineRequest::new(a.id, 6)];
        let snapshot = [a];

        assert_eq!(
            plan_reservation(&accepted, &snapshot).ok(),
            plan_reservation(&accepted, &snapshot).ok()
        );
        assert!(plan_reservation(&rejected, &snapshot).is_err());
        assert!(plan_reservation(&rejected, &snapshot).is_err());
    }
}
