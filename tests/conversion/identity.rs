use powertools::query::{Dialect, convert};

#[test]
fn test_same_dialect_is_identity() {
    let inputs = [
        "",
        "   ",
        "SELECT * FROM account",
        "not a query at all <",
        "/api/data/v9.2/contacts?$select=fullname",
    ];
    for dialect in Dialect::ALL {
        for input in inputs {
            let result = convert(input, dialect, dialect);
            assert!(result.succeeded);
            assert_eq!(result.text, input);
        }
    }
}

#[test]
fn test_empty_input_for_every_pair() {
    for from in Dialect::ALL {
        for to in Dialect::ALL {
            let result = convert("", from, to);
            assert!(result.succeeded, "{} -> {}", from, to);
            assert_eq!(result.text, "");
        }
    }
}
