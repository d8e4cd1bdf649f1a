use crate::models::*;
use anyhow::{anyhow, bail, Result};

fn validate_amounts(shares: f64, price: f64) -> Result<()> {
    if !shares.is_finite() || shares <= 0.0 {
        bail!("Shares must be a positive number, got {}", shares);
    }
    if !price.is_finite() || price < 0.0 {
        bail!("Price must be a non-negative number, got {}", price);
    }
    Ok(())
}

impl Portfolio {
    /// Uppercase every symbol and copy map keys into the positions.
    pub fn normalize(&mut self) -> Result<()> {
        let stocks = std::mem::take(&mut self.stocks);
        for (key, mut position) in stocks {
            if position.shares < 0.0 || !position.shares.is_finite() {
                bail!("Position {} has invalid share count {}", key, position.shares);
            }
            let symbol = key.trim().to_uppercase();
            position.symbol = symbol.clone();
            self.stocks.insert(symbol, position);
        }
        Ok(())
    }

    /// Positions ordered by symbol.
    pub fn positions(&self) -> Vec<Position> {
        self.stocks.values().cloned().collect()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.stocks.keys().cloned().collect()
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.stocks.get(&symbol.to_uppercase())
    }

    /// Add shares. Buying more of an existing holding merges into it and
    /// re-derives the average price from the combined cost.
    pub fn add_position(&mut self, symbol: &str, shares: f64, price: f64, notes: Option<String>) -> Result<&Position> {
        validate_amounts(shares, price)?;
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("Symbol must not be empty");
        }

        let position = self
            .stocks
            .entry(symbol.clone())
            .and_modify(|existing| {
                existing.shares += shares;
                existing.total_invested += shares * price;
                existing.avg_price = existing.total_invested / existing.shares;
                if notes.is_some() {
                    existing.notes = notes.clone();
                }
            })
            .or_insert_with(|| Position {
                notes: notes.clone(),
                ..Position::new(&symbol, shares, price)
            });

        Ok(position)
    }

    /// Overwrite share count and/or average price; invested capital is recomputed.
    pub fn update_position(
        &mut self,
        symbol: &str,
        shares: Option<f64>,
        avg_price: Option<f64>,
        notes: Option<String>,
    ) -> Result<&Position> {
        let symbol = symbol.trim().to_uppercase();
        let position = self
            .stocks
            .get_mut(&symbol)
            .ok_or_else(|| anyhow!("No position found for {}", symbol))?;

        let shares = shares.unwrap_or(position.shares);
        let avg_price = avg_price.unwrap_or(position.avg_price);
        validate_amounts(shares, avg_price)?;

        position.shares = shares;
        position.avg_price = avg_price;
        position.total_invested = shares * avg_price;
        if notes.is_some() {
            position.notes = notes;
        }
        Ok(position)
    }

    /// Sell part of a holding at cost basis. Selling everything removes the position.
    pub fn remove_shares(&mut self, symbol: &str, shares: f64) -> Result<Option<Position>> {
        let symbol = symbol.trim().to_uppercase();
        let position = self
            .stocks
            .get_mut(&symbol)
            .ok_or_else(|| anyhow!("No position found for {}", symbol))?;

        if shares > position.shares + f64::EPSILON {
            bail!(
                "Cannot remove {} shares of {}: only {} held",
                shares,
                symbol,
                position.shares
            );
        }

        let remaining = position.shares - shares;
        if remaining <= f64::EPSILON {
            self.stocks.remove(&symbol);
            return Ok(None);
        }

        position.total_invested *= remaining / position.shares;
        position.shares = remaining;
        Ok(Some(position.clone()))
    }

    pub fn delete_position(&mut self, symbol: &str) -> Result<Position> {
        let symbol = symbol.trim().to_uppercase();
        self.stocks
            .remove(&symbol)
            .ok_or_else(|| anyhow!("No position found for {}", symbol))
    }

    pub fn set_cash(&mut self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            bail!("Cash must be a non-negative number, got {}", amount);
        }
        self.cash.available = amount;
        Ok(())
    }

    pub fn total_invested(&self) -> f64 {
        self.stocks.values().map(|p| p.total_invested).sum()
    }
}
