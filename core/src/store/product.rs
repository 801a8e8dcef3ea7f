use super::{decimal_at, optional_decimal_at, optional_term_at, SimStore};
use crate::{error::LoanResult, product::Product, repository::ProductSource};
use rusqlite::params;

impl SimStore {
    /// Replace the whole catalog in one transaction, keeping slice order
    /// as catalog order.
    pub fn replace_products(&self, products: &[Product]) -> LoanResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM product", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO product (
                    code, catalog_order, name, monthly_rate,
                    min_term, max_term, min_amount, max_amount
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (order, p) in products.iter().enumerate() {
                stmt.execute(params![
                    p.code,
                    order as i64,
                    p.name,
                    p.monthly_rate.to_string(),
                    p.min_term,
                    p.max_term,
                    p.min_amount.map(|d| d.to_string()),
                    p.max_amount.map(|d| d.to_string()),
                ])?;
            }
        }
        tx.commit()?;
        log::info!("store: catalog replaced with {} products", products.len());
        Ok(())
    }

    pub fn products(&self) -> LoanResult<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT code, name, monthly_rate, min_term, max_term, min_amount, max_amount
             FROM product
             ORDER BY catalog_order ASC",
        )?;
        let products = stmt
            .query_map([], |row| {
                Ok(Product {
                    code:         row.get(0)?,
                    name:         row.get(1)?,
                    monthly_rate: decimal_at(row, 2)?,
                    min_term:     optional_term_at(row, 3)?,
                    max_term:     optional_term_at(row, 4)?,
                    min_amount:   optional_decimal_at(row, 5)?,
                    max_amount:   optional_decimal_at(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}

impl ProductSource for SimStore {
    fn list_all(&self) -> LoanResult<Vec<Product>> {
        self.products()
    }
}
