//! Dashboard statistics
//!
//! [`compute`] is a pure fold over the documents so it can be tested without
//! storage; [`load`] fetches the collections and calls it.

use crate::core::error::ShopResult;
use crate::entities::{Order, OrderStatus, Product, User, round_cents};
use crate::storage::Repositories;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Products at or below this stock level are reported as low
pub const LOW_STOCK_THRESHOLD: i64 = 5;
const TOP_PRODUCTS: usize = 5;
const RECENT_ORDERS: usize = 5;
const REVENUE_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub orders: OrderStats,
    pub revenue: RevenueStats,
    pub products: ProductStats,
    pub users: UserStats,
    pub orders_by_status: BTreeMap<String, usize>,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<RecentOrder>,
    /// Revenue keyed by `YYYY-MM`, oldest first
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

/// Counts per reporting window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: usize,
    pub today: usize,
    pub week: usize,
    pub month: usize,
    pub last_month: usize,
}

/// Revenue per reporting window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total: f64,
    pub today: f64,
    pub week: f64,
    pub month: f64,
    pub last_month: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: usize,
    pub active: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: usize,
    pub new_today: usize,
    pub new_this_week: usize,
    pub new_this_month: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: f64,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub orders: usize,
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

struct Windows {
    today: Window,
    week: Window,
    month: Window,
    last_month: Window,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

impl Windows {
    fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let month_start = first_of_month(today);
        let last_month_start = month_start
            .checked_sub_months(Months::new(1))
            .unwrap_or(month_start);
        let end = now + chrono::Duration::seconds(1);

        Self {
            today: Window {
                start: midnight(today),
                end,
            },
            week: Window {
                start: now
                    .checked_sub_days(Days::new(7))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
                end,
            },
            month: Window {
                start: midnight(month_start),
                end,
            },
            last_month: Window {
                start: midnight(last_month_start),
                end: midnight(month_start),
            },
        }
    }
}

/// Aggregate dashboard figures as of `now`
pub fn compute(
    products: &[Product],
    orders: &[Order],
    users: &[User],
    now: DateTime<Utc>,
) -> DashboardStats {
    let windows = Windows::at(now);

    let mut order_stats = OrderStats {
        total: orders.len(),
        ..Default::default()
    };
    let mut revenue = RevenueStats::default();
    let mut orders_by_status: BTreeMap<String, usize> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut sellers: HashMap<Uuid, TopProduct> = HashMap::new();

    for order in orders {
        let at = order.created_at;
        let sale = order.order_status.counts_as_sale();
        let amount = if sale { order.total_price } else { 0.0 };

        revenue.total += amount;
        for (window, count, sum) in [
            (windows.today, &mut order_stats.today, &mut revenue.today),
            (windows.week, &mut order_stats.week, &mut revenue.week),
            (windows.month, &mut order_stats.month, &mut revenue.month),
            (
                windows.last_month,
                &mut order_stats.last_month,
                &mut revenue.last_month,
            ),
        ] {
            if window.contains(at) {
                *count += 1;
                *sum += amount;
            }
        }

        *orders_by_status
            .entry(order.order_status.as_str().to_string())
            .or_default() += 1;

        if order.order_status != OrderStatus::Cancelled {
            for item in &order.order_items {
                let entry = sellers.entry(item.product).or_insert_with(|| TopProduct {
                    product_id: item.product,
                    name: item.name.clone(),
                    quantity_sold: 0,
                    revenue: 0.0,
                });
                entry.quantity_sold = entry.quantity_sold.saturating_add(item.quantity);
                entry.revenue += item.price * item.quantity as f64;
            }
        }
    }

    revenue.total = round_cents(revenue.total);
    revenue.today = round_cents(revenue.today);
    revenue.week = round_cents(revenue.week);
    revenue.month = round_cents(revenue.month);
    revenue.last_month = round_cents(revenue.last_month);

    let mut top_products: Vec<TopProduct> = sellers
        .into_values()
        .map(|mut p| {
            p.revenue = round_cents(p.revenue);
            p
        })
        .collect();
    top_products.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_products.truncate(TOP_PRODUCTS);

    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_orders = recent
        .into_iter()
        .take(RECENT_ORDERS)
        .map(|o| RecentOrder {
            id: o.id,
            user_id: o.user_id,
            total_price: o.total_price,
            order_status: o.order_status,
            created_at: o.created_at,
        })
        .collect();

    DashboardStats {
        orders: order_stats,
        revenue,
        products: product_stats(products),
        users: user_stats(users, &windows),
        orders_by_status,
        top_products,
        recent_orders,
        monthly_revenue: monthly_revenue(orders, now),
    }
}

fn product_stats(products: &[Product]) -> ProductStats {
    ProductStats {
        total: products.len(),
        active: products.iter().filter(|p| p.is_active).count(),
        out_of_stock: products.iter().filter(|p| p.stock <= 0).count(),
        low_stock: products
            .iter()
            .filter(|p| p.stock > 0 && p.stock <= LOW_STOCK_THRESHOLD)
            .count(),
    }
}

fn user_stats(users: &[User], windows: &Windows) -> UserStats {
    let count = |window: Window| users.iter().filter(|u| window.contains(u.created_at)).count();
    UserStats {
        total: users.len(),
        new_today: count(windows.today),
        new_this_week: count(windows.week),
        new_this_month: count(windows.month),
    }
}

fn monthly_revenue(orders: &[Order], now: DateTime<Utc>) -> Vec<MonthlyRevenue> {
    let current = first_of_month(now.date_naive());

    (0..REVENUE_MONTHS)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|start| {
            let end = start
                .checked_add_months(Months::new(1))
                .map(midnight)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let window = Window {
                start: midnight(start),
                end,
            };
            let in_month: Vec<&Order> = orders
                .iter()
                .filter(|o| window.contains(o.created_at))
                .collect();
            MonthlyRevenue {
                month: start.format("%Y-%m").to_string(),
                revenue: round_cents(
                    in_month
                        .iter()
                        .filter(|o| o.order_status.counts_as_sale())
                        .map(|o| o.total_price)
                        .sum(),
                ),
                orders: in_month.len(),
            }
        })
        .collect()
}

/// Load every collection the dashboard needs and aggregate it
pub async fn load(repos: &Repositories) -> ShopResult<DashboardStats> {
    let (products, orders, users) = tokio::try_join!(
        repos.products.list(),
        repos.orders.list(),
        repos.users.list()
    )?;
    Ok(compute(&products, &orders, &users, Utc::now()))
}
