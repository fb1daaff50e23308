//! Window-function and join exercises, written once with `{layer}` placeholders.

use crate::error::{OlistError, Result};
use crate::types::Layer;
use std::fmt;
use std::str::FromStr;

pub fn render_for_layer(template: &str, layer: Layer) -> String {
    template.replace("{layer}", layer.as_str())
}

const TOP_CUSTOMERS: &str = "
WITH customer_payments AS (
    SELECT
        o.customer_id,
        SUM(p.payment_value) AS total_payment
    FROM {layer}_olist_order_payments_dataset p
    JOIN {layer}_olist_orders_dataset o
        ON p.order_id = o.order_id
    GROUP BY o.customer_id
)
SELECT
    customer_id,
    ROUND(total_payment, 2) AS total_payment,
    RANK() OVER (ORDER BY total_payment DESC) AS customer_rank
FROM customer_payments
ORDER BY customer_rank
LIMIT 20";

const PAYMENT_VS_CUSTOMER_AVERAGE: &str = "
SELECT
    o.order_id,
    o.customer_id,
    ROUND(p.payment_value, 2) AS payment_value,
    ROUND(AVG(p.payment_value) OVER (PARTITION BY o.customer_id), 2) AS avg_customer_payment,
    ROUND(p.payment_value - AVG(p.payment_value) OVER (PARTITION BY o.customer_id), 2) AS diff_from_avg
FROM {layer}_olist_orders_dataset o
JOIN {layer}_olist_order_payments_dataset p
    ON o.order_id = p.order_id
ORDER BY o.customer_id, o.order_id
LIMIT 50";

const SELLER_SALE_GAPS: &str = "
WITH sellers_with_multiple_sales AS (
    SELECT seller_id
    FROM {layer}_olist_order_items_dataset
    GROUP BY seller_id
    HAVING COUNT(*) >= 2
),
seller_orders AS (
    SELECT
        oi.seller_id,
        oi.order_id,
        o.order_purchase_timestamp
    FROM {layer}_olist_order_items_dataset oi
    JOIN {layer}_olist_orders_dataset o
        ON oi.order_id = o.order_id
    WHERE oi.seller_id IN (SELECT seller_id FROM sellers_with_multiple_sales)
)
SELECT
    seller_id,
    order_purchase_timestamp,
    LAG(order_purchase_timestamp) OVER (
        PARTITION BY seller_id
        ORDER BY order_purchase_timestamp
    ) AS previous_sale_timestamp,
    ROUND(
        julianday(order_purchase_timestamp) - julianday(LAG(order_purchase_timestamp) OVER (
            PARTITION BY seller_id
            ORDER BY order_purchase_timestamp
        )),
        1
    ) AS days_since_previous_sale
FROM seller_orders
ORDER BY days_since_previous_sale DESC
LIMIT 50";

const DELIVERED_ORDERS_JOIN: &str = "
SELECT
    o.order_id,
    o.customer_id,
    o.order_status,
    p.payment_value,
    i.product_id,
    i.seller_id
FROM {layer}_olist_orders_dataset o
JOIN {layer}_olist_order_payments_dataset p ON o.order_id = p.order_id
JOIN {layer}_olist_order_items_dataset i ON o.order_id = i.order_id
WHERE o.order_status = 'delivered'
LIMIT 100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exercise {
    /// CTE + RANK(): customers ranked by total payment.
    TopCustomers,
    /// AVG() OVER (PARTITION BY): each payment against the customer's average.
    PaymentVsCustomerAverage,
    /// LAG(): days between consecutive sales of the same seller.
    SellerSaleGaps,
    /// Three-way join used to compare plans with and without indexes.
    DeliveredOrdersJoin,
}

impl Exercise {
    pub fn all() -> [Exercise; 4] {
        [
            Self::TopCustomers,
            Self::PaymentVsCustomerAverage,
            Self::SellerSaleGaps,
            Self::DeliveredOrdersJoin,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::TopCustomers => "top-customers",
            Self::PaymentVsCustomerAverage => "payment-vs-average",
            Self::SellerSaleGaps => "seller-sale-gaps",
            Self::DeliveredOrdersJoin => "delivered-join",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::TopCustomers => TOP_CUSTOMERS,
            Self::PaymentVsCustomerAverage => PAYMENT_VS_CUSTOMER_AVERAGE,
            Self::SellerSaleGaps => SELLER_SALE_GAPS,
            Self::DeliveredOrdersJoin => DELIVERED_ORDERS_JOIN,
        }
        .trim()
    }

    pub fn sql(&self, layer: Layer) -> String {
        render_for_layer(self.template(), layer)
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Exercise {
    type Err = OlistError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|e| e.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::all().iter().map(|e| e.key()).collect();
                OlistError::Configuration(format!("Unknown exercise '{}'. Available: {}", s, keys.join(", ")))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::types::IfExists;
    use polars::df;

    fn seeded() -> Database {
        let mut db = Database::in_memory().unwrap();
        let orders = df! {
            "order_id" => &["o1", "o2", "o3"],
            "customer_id" => &["c1", "c1", "c2"],
            "order_status" => &["delivered", "delivered", "canceled"],
            "order_purchase_timestamp" => &["2018-01-01 10:00:00", "2018-01-04 10:00:00", "2018-01-02 09:00:00"],
        }
        .unwrap();
        let payments = df! {
            "order_id" => &["o1", "o2", "o3"],
            "payment_value" => &[100.0, 50.0, 20.0],
        }
        .unwrap();
        let items = df! {
            "order_id" => &["o1", "o2", "o3"],
            "product_id" => &["p1", "p2", "p1"],
            "seller_id" => &["s1", "s1", "s2"],
        }
        .unwrap();

        db.write(&orders, "olist_orders_dataset", Layer::Bronze, IfExists::Replace).unwrap();
        db.write(&payments, "olist_order_payments_dataset", Layer::Bronze, IfExists::Replace).unwrap();
        db.write(&items, "olist_order_items_dataset", Layer::Bronze, IfExists::Replace).unwrap();
        db
    }

    #[test]
    fn test_render_for_layer() {
        let sql = Exercise::DeliveredOrdersJoin.sql(Layer::Silver);
        assert!(sql.contains("silver_olist_orders_dataset"));
        assert!(!sql.contains("{layer}"));
    }

    #[test]
    fn test_top_customers_rank() {
        let db = seeded();
        let result = db.query(&Exercise::TopCustomers.sql(Layer::Bronze)).unwrap();
        assert_eq!(result.height(), 2);
        assert_eq!(result.column("customer_id").unwrap().str().unwrap().get(0), Some("c1"));
        assert_eq!(result.column("total_payment").unwrap().f64().unwrap().get(0), Some(150.0));
        assert_eq!(result.column("customer_rank").unwrap().i64().unwrap().get(0), Some(1));
    }

    #[test]
    fn test_seller_sale_gaps() {
        let db = seeded();
        let result = db.query(&Exercise::SellerSaleGaps.sql(Layer::Bronze)).unwrap();
        assert_eq!(result.height(), 2);
        assert_eq!(
            result.column("days_since_previous_sale").unwrap().f64().unwrap().get(0),
            Some(3.0)
        );
    }

    #[test]
    fn test_every_exercise_runs() {
        let db = seeded();
        for exercise in Exercise::all() {
            assert!(db.query(&exercise.sql(Layer::Bronze)).is_ok(), "{} failed", exercise);
        }
        assert_eq!("delivered-join".parse::<Exercise>().unwrap(), Exercise::DeliveredOrdersJoin);
        assert!("nope".parse::<Exercise>().is_err());
    }
}
