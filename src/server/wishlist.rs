use derive_more::Display;
use std::collections::BTreeMap;

pub const FILENAME: &str = "wishlist.txt";
const SIGNATURE: &str = "FoodGram, 2021";

#[derive(Display, Debug, PartialEq, Eq)]
#[display("{amount} {measurement_unit}")]
pub struct WishlistItem {
    measurement_unit: String,
    amount: i64,
}

/// Sum amounts per ingredient name. When the same name shows up with
/// different units the unit kept is whichever was seen first; the amounts
/// still sum across units.
pub fn aggregate(rows: Vec<(String, String, i32)>) -> BTreeMap<String, WishlistItem> {
    let mut list: BTreeMap<String, WishlistItem> = BTreeMap::new();
    for (name, measurement_unit, amount) in rows {
        list.entry(name)
            .or_insert(WishlistItem {
                measurement_unit,
                amount: 0,
            })
            .amount += amount as i64;
    }
    list
}

pub fn render(list: &BTreeMap<String, WishlistItem>) -> String {
    let mut body = String::new();
    for (name, item) in list {
        body += &format!("{name} - {item} \n");
    }
    body += "\n";
    body += SIGNATURE;
    body
}

#[test]
fn aggregate_sums_amounts_per_name() {
    use maplit::btreemap;

    let rows = vec![
        ("flour".to_string(), "g".to_string(), 200),
        ("salt".to_string(), "g".to_string(), 5),
        ("flour".to_string(), "g".to_string(), 100),
    ];
    assert_eq!(
        aggregate(rows),
        btreemap! {
            "flour".to_string() => WishlistItem { measurement_unit: "g".into(), amount: 300 },
            "salt".to_string() => WishlistItem { measurement_unit: "g".into(), amount: 5 },
        }
    );
}

#[test]
fn aggregate_keeps_first_seen_unit() {
    use maplit::btreemap;

    let rows = vec![
        ("flour".to_string(), "g".to_string(), 200),
        ("flour".to_string(), "kg".to_string(), 1),
    ];
    assert_eq!(
        aggregate(rows),
        btreemap! {
            "flour".to_string() => WishlistItem { measurement_unit: "g".into(), amount: 201 },
        }
    );
}

#[test]
fn render_one_line_per_ingredient_with_signature() {
    let rows = vec![
        ("flour".to_string(), "g".to_string(), 200),
        ("salt".to_string(), "g".to_string(), 5),
        ("flour".to_string(), "g".to_string(), 100),
    ];
    let body = render(&aggregate(rows));
    assert_eq!(body, "flour - 300 g \nsalt - 5 g \n\nFoodGram, 2021");
}

#[test]
fn render_empty_list() {
    let body = render(&aggregate(vec![]));
    assert_eq!(body, "\nFoodGram, 2021");
}
