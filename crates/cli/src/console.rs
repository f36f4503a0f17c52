//! Line-oriented prompting and table rendering for the interactive menu.

use std::io::{self, BufRead, Write};

use crate::client::{CustomerView, OrderView, ProductView};

/// Reads answers from `input`, writes prompts and reports to `output`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print `label`, read one line, and return it trimmed.
    ///
    /// End of input surfaces as `UnexpectedEof` so the menu loop can stop.
    pub fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Re-prompt until the answer parses as an integer.
    pub fn prompt_int(&mut self, label: &str) -> io::Result<i64> {
        loop {
            let raw = self.prompt(label)?;
            match raw.parse::<i64>() {
                Ok(n) => return Ok(n),
                Err(_) => writeln!(self.output, "Please enter a whole number.")?,
            }
        }
    }

    /// Like [`Console::prompt_int`], but an empty answer yields `None`.
    pub fn prompt_optional_int(&mut self, label: &str) -> io::Result<Option<i64>> {
        loop {
            let raw = self.prompt(label)?;
            if raw.is_empty() {
                return Ok(None);
            }
            match raw.parse::<i64>() {
                Ok(n) => return Ok(Some(n)),
                Err(_) => writeln!(self.output, "Please enter a whole number, or leave blank to finish.")?,
            }
        }
    }

    /// Re-prompt until the answer is a non-negative amount with at most two decimals.
    pub fn prompt_price(&mut self, label: &str) -> io::Result<String> {
        loop {
            let raw = self.prompt(label)?;
            if is_price(&raw) {
                return Ok(raw);
            }
            writeln!(self.output, "Please enter a price like 9.99.")?;
        }
    }
}

fn is_price(raw: &str) -> bool {
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.len() <= 2
        && frac.chars().all(|c| c.is_ascii_digit())
        && !(raw.ends_with('.'))
}

pub fn products_table(products: &[ProductView]) -> String {
    if products.is_empty() {
        return "No products.\n".to_string();
    }
    let mut out = format!("{:<5} {:<24} {:>10} {:>7}\n", "ID", "Name", "Price", "Stock");
    for p in products {
        out.push_str(&format!(
            "{:<5} {:<24} {:>10} {:>7}\n",
            p.id,
            p.name,
            format!("${}", p.price),
            p.stock
        ));
    }
    out
}

pub fn customers_table(customers: &[CustomerView]) -> String {
    if customers.is_empty() {
        return "No customers.\n".to_string();
    }
    let mut out = format!("{:<5} {:<24} {:<16}\n", "ID", "Name", "Phone");
    for c in customers {
        out.push_str(&format!(
            "{:<5} {:<24} {:<16}\n",
            c.id,
            c.name,
            c.phone.as_deref().unwrap_or("-")
        ));
    }
    out
}

pub fn orders_report(orders: &[OrderView]) -> String {
    if orders.is_empty() {
        return "No orders.\n".to_string();
    }
    let mut out = String::new();
    for o in orders {
        out.push_str(&format!(
            "Order #{} customer={} created={}\n",
            o.id,
            o.customer_id,
            o.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
        for item in &o.items {
            out.push_str(&format!(
                "  - product {} x{} @ ${}\n",
                item.product_id, item.qty, item.price_each
            ));
        }
        if let Some(total) = &o.total {
            out.push_str(&format!("  total ${total}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::OrderItemView;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn int_prompt_retries_until_valid() {
        let mut c = console("abc\n\n 12 \n");
        assert_eq!(c.prompt_int("qty: ").unwrap(), 12);
        let written = String::from_utf8(c.output).unwrap();
        assert_eq!(written.matches("Please enter a whole number.").count(), 2);
    }

    #[test]
    fn blank_optional_int_finishes() {
        let mut c = console("x\n\n");
        assert_eq!(c.prompt_optional_int("product: ").unwrap(), None);
    }

    #[test]
    fn closed_input_is_eof() {
        let mut c = console("");
        let err = c.prompt_int("qty: ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn price_shapes() {
        for ok in ["0", "9", "9.9", "9.99", "120.00"] {
            assert!(is_price(ok), "{ok}");
        }
        for bad in ["", "-1", "9.999", "9.", ".5", "1e3", "ten"] {
            assert!(!is_price(bad), "{bad}");
        }

        let mut c = console("9.999\n4.50\n");
        assert_eq!(c.prompt_price("price: ").unwrap(), "4.50");
    }

    #[test]
    fn order_report_lists_items_and_total() {
        let orders = vec![OrderView {
            id: 3,
            customer_id: 1,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            items: vec![OrderItemView {
                product_id: 2,
                qty: 3,
                price_each: "10.00".to_string(),
            }],
            total: Some("30.00".to_string()),
        }];
        assert_eq!(
            orders_report(&orders),
            "Order #3 customer=1 created=2024-05-01 12:00:00\n  - product 2 x3 @ $10.00\n  total $30.00\n"
        );
        assert_eq!(orders_report(&[]), "No orders.\n");
    }

    #[test]
    fn customer_without_phone_shows_dash() {
        let table = customers_table(&[CustomerView {
            id: 1,
            name: "Ada".to_string(),
            phone: None,
        }]);
        assert!(table.lines().nth(1).unwrap().trim_end().ends_with('-'));
    }
}
