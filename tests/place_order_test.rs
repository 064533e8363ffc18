//! Order placement through the public API, backed by the in-memory store.
//!
//! The same scenarios run against Postgres in `infrastructure::pg_store`
//! (ignored by default, they need a container runtime).

use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use bigdecimal::BigDecimal;
use order_placement::{Customer, InMemoryStore, OrderLineRequest, OrderService, PlaceOrderError, Product};
use uuid::Uuid;

struct Shop {
    service: OrderService<InMemoryStore>,
    customer: Uuid,
    a: Uuid,
    b: Uuid,
}

fn product(name: &str, price: &str, quantity: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        price: BigDecimal::from_str(price).expect("valid decimal"),
        quantity,
    }
}

/// Inventory: Product A (price 10.00, quantity 5), Product B (price 3.00, quantity 2).
fn shop() -> Shop {
    let store = InMemoryStore::new();
    let customer = Uuid::new_v4();
    store.insert_customer(Customer { id: customer });

    let a = product("A", "10.00", 5);
    let b = product("B", "3.00", 2);
    let (a_id, b_id) = (a.id, b.id);
    store.insert_product(a);
    store.insert_product(b);

    Shop {
        service: OrderService::new(store),
        customer,
        a: a_id,
        b: b_id,
    }
}

fn quantity(shop: &Shop, id: Uuid) -> i32 {
    shop.service
        .store()
        .product(id)
        .map(|p| p.quantity)
        .expect("product should exist")
}

#[test]
fn valid_request_creates_order_and_decrements_stock() {
    let shop = shop();

    let order = shop
        .service
        .place_order(
            shop.customer,
            &[OrderLineRequest::new(shop.a, 3), OrderLineRequest::new(shop.b, 1)],
        )
        .expect("order should be placed");

    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.lines[0].product_id, shop.a);
    assert_eq!(order.lines[0].price, BigDecimal::from_str("10.00").unwrap());
    assert_eq!(order.lines[0].quantity, 3);
    assert_eq!(order.lines[1].product_id, shop.b);
    assert_eq!(order.lines[1].price, BigDecimal::from_str("3.00").unwrap());
    assert_eq!(order.lines[1].quantity, 1);
    assert_eq!(quantity(&shop, shop.a), 2);
    assert_eq!(quantity(&shop, shop.b), 1);
}

#[test]
fn unknown_product_fails_without_touching_stock() {
    let shop = shop();
    let c = Uuid::new_v4();

    let err = shop
        .service
        .place_order(
            shop.customer,
            &[OrderLineRequest::new(shop.a, 3), OrderLineRequest::new(c, 1)],
        )
        .unwrap_err();

    assert!(matches!(err, PlaceOrderError::ProductNotFound(id) if id == c));
    assert_eq!(quantity(&shop, shop.a), 5);
    assert_eq!(quantity(&shop, shop.b), 2);
    assert_eq!(shop.service.store().order_count(), 0);
}

#[test]
fn oversized_request_fails_without_touching_stock() {
    let shop = shop();

    let err = shop
        .service
        .place_order(shop.customer, &[OrderLineRequest::new(shop.a, 9)])
        .unwrap_err();

    assert!(matches!(
        err,
        PlaceOrderError::InsufficientStock { product_id, requested: 9 } if product_id == shop.a
    ));
    assert_eq!(err.to_string(), format!("The quantity 9 is not available for product {}", shop.a));
    assert_eq!(quantity(&shop, shop.a), 5);
    assert_eq!(shop.service.store().order_count(), 0);
}

#[test]
fn unknown_customer_fails_without_writes() {
    let shop = shop();

    let err = shop
        .service
        .place_order(Uuid::new_v4(), &[OrderLineRequest::new(shop.a, 1)])
        .unwrap_err();

    assert!(matches!(err, PlaceOrderError::CustomerNotFound(_)));
    assert!(err.is_rejection());
    assert_eq!(quantity(&shop, shop.a), 5);
    assert!(shop.service.store().outbox().is_empty());
}

#[test]
fn sequential_orders_drain_stock_then_fail() {
    let shop = shop();

    for _ in 0..2 {
        shop.service
            .place_order(shop.customer, &[OrderLineRequest::new(shop.b, 1)])
            .expect("order should be placed");
    }
    let err = shop
        .service
        .place_order(shop.customer, &[OrderLineRequest::new(shop.b, 1)])
        .unwrap_err();

    assert!(matches!(err, PlaceOrderError::InsufficientStock { requested: 1, .. }));
    assert_eq!(quantity(&shop, shop.b), 0);
    assert_eq!(shop.service.store().order_count(), 2);
    assert_eq!(shop.service.store().outbox().len(), 2);
}

#[test]
fn concurrent_orders_for_full_stock_do_not_oversell() {
    let shop = shop();
    let service = Arc::new(shop.service);
    let (customer, product_id) = (shop.customer, shop.a);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.place_order(customer, &[OrderLineRequest::new(product_id, 5)]))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, PlaceOrderError::InsufficientStock { requested: 5, .. }),
            "unexpected error: {err}"
        );
    }

    let store = service.store();
    assert_eq!(store.product(product_id).map(|p| p.quantity), Some(0));
    assert_eq!(store.order_count(), 1);
}

#[test]
fn concurrent_small_orders_never_go_negative() {
    let shop = shop();
    let service = Arc::new(shop.service);
    let (customer, product_id) = (shop.customer, shop.a);

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.place_order(customer, &[OrderLineRequest::new(product_id, 2)]))
        })
        .collect();

    let placed = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(|r| r.is_ok())
        .count();

    // 5 units in stock, 2 per order.
    assert_eq!(placed, 2);
    assert_eq!(service.store().product(product_id).map(|p| p.quantity), Some(1));
}
