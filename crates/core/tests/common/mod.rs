//! Shared raw-layer fixture
//!
//! Three orders: `o1` is clean, `o2` arrives as `invoiced` with a purchase
//! after its approval and is under-paid by 10.00, `o3` has a bogus status and
//! only a purchase date. Item `o2/1` references the unknown seller `s9` and
//! review `r2` references the unknown order `o9`.

#![allow(dead_code)]

use std::path::Path;

pub const ORDERS: &str = "\
order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date
o1,c1,delivered,2018-01-02 10:00:00,2018-01-02 11:00:00,2018-01-04 09:00:00,2018-01-08 15:00:00,2018-01-20 00:00:00
o2,c2,invoiced,2018-02-03 08:00:00,2018-02-01 09:00:00,,,2018-02-25 00:00:00
o3,c3,bogus,2018-03-05 12:00:00,,,,
";

pub const CUSTOMERS: &str = "\
customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state
c1,u1,123,Sao Paulo,sp
c2,u2,01310,Campinas,SP
c3,u3,99999,Rio de Janeiro,RJ
";

pub const ORDER_ITEMS: &str = "\
order_id,order_item_id,product_id,seller_id,shipping_limit_date,price,freight_value
o1,1,p1,s1,2018-01-05 00:00:00,80.00,20.00
o2,1,p2,s9,2018-02-06 00:00:00,50.00,10.00
";

pub const PRODUCTS: &str = "\
product_id,product_category_name,product_name_lenght,product_description_lenght,product_photos_qty,product_weight_g,product_length_cm,product_height_cm,product_width_cm
p1,beleza_saude,40,300,2,30,10,5,4
p2,,50,200,1,80,20,10,10
";

pub const TRANSLATIONS: &str = "\
product_category_name,product_category_name_english
beleza_saude,health_beauty
";

pub const SELLERS: &str = "\
seller_id,seller_zip_code_prefix,seller_city,seller_state
s1,1310,sao paulo,SP
";

pub const PAYMENTS: &str = "\
order_id,payment_sequential,payment_type,payment_installments,payment_value
o1,1,credit_card,3,100.00
o2,1,boleto,1,50.00
";

pub const REVIEWS: &str = "\
review_id,order_id,review_score,review_comment_title,review_comment_message,review_creation_date,review_answer_timestamp
r1,o1,5,, Great  product ,2018-01-09 00:00:00,2018-01-10 12:00:00
r2,o9,3,,,2018-03-01 00:00:00,2018-03-02 00:00:00
";

pub const GEOLOCATION: &str = "\
geolocation_zip_code_prefix,geolocation_lat,geolocation_lng,geolocation_city,geolocation_state
123,-23.5,-46.6,sao paulo,SP
00123,-23.7,-46.8,Sao Paulo,SP
1310,-22.9,-47.0,campinas,SP
";

/// Write every raw extract under `root/raw/`
pub fn write_raw_layer(root: &Path) {
    let raw = root.join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    for (file, content) in [
        ("olist_orders_dataset.csv", ORDERS),
        ("olist_customers_dataset.csv", CUSTOMERS),
        ("olist_order_items_dataset.csv", ORDER_ITEMS),
        ("olist_products_dataset.csv", PRODUCTS),
        ("product_category_name_translation.csv", TRANSLATIONS),
        ("olist_sellers_dataset.csv", SELLERS),
        ("olist_order_payments_dataset.csv", PAYMENTS),
        ("olist_order_reviews_dataset.csv", REVIEWS),
        ("olist_geolocation_dataset.csv", GEOLOCATION),
    ] {
        std::fs::write(raw.join(file), content).unwrap();
    }
}
