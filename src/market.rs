//! Trading pair catalogue.
//!
//! A pair is static metadata: which asset is traded, which it settles in, and
//! how many decimals each side carries. The catalogue tracks the pair the
//! trading views are currently showing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    /// e.g. "WETH-DAI"
    pub id: String,
    pub base: String,
    pub quote: String,
    pub base_decimals: u32,
    pub quote_decimals: u32,
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            id: format!("{}-{}", base, quote),
            base: base.to_string(),
            quote: quote.to_string(),
            base_decimals: 18,
            quote_decimals: 18,
        }
    }

    pub fn display_symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Decimals used when showing prices: stablecoin quotes get cents, everything else 6.
    pub fn price_precision(&self) -> u32 {
        if self.quote == "DAI" {
            2
        } else {
            6
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCatalogue {
    pairs: Vec<TradingPair>,
    selected: usize,
}

impl Default for MarketCatalogue {
    fn default() -> Self {
        Self {
            pairs: vec![TradingPair::new("WETH", "DAI"), TradingPair::new("HYDRO", "WETH")],
            selected: 0,
        }
    }
}

impl MarketCatalogue {
    /// The first pair starts selected. None for an empty list, a catalogue always has a selection.
    pub fn new(pairs: Vec<TradingPair>) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }
        Some(Self { pairs, selected: 0 })
    }

    pub fn pairs(&self) -> &[TradingPair] {
        &self.pairs
    }

    pub fn get(&self, pair_id: &str) -> Option<&TradingPair> {
        self.pairs.iter().find(|p| p.id == pair_id)
    }

    pub fn selected(&self) -> &TradingPair {
        &self.pairs[self.selected]
    }

    /// Unknown ids leave the selection alone.
    pub fn select(&mut self, pair_id: &str) -> bool {
        match self.pairs.iter().position(|p| p.id == pair_id) {
            Some(idx) => {
                self.selected = idx;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_is_first_pair() {
        let catalogue = MarketCatalogue::default();
        assert_eq!(catalogue.selected().id, "WETH-DAI");
        assert_eq!(catalogue.selected().display_symbol(), "WETH/DAI");
    }

    #[test]
    fn select_known_and_unknown() {
        let mut catalogue = MarketCatalogue::default();
        assert!(catalogue.select("HYDRO-WETH"));
        assert_eq!(catalogue.selected().base, "HYDRO");

        assert!(!catalogue.select("BTC-USD"));
        assert_eq!(catalogue.selected().id, "HYDRO-WETH");
    }

    #[test]
    fn empty_catalogue_refused() {
        assert!(MarketCatalogue::new(Vec::new()).is_none());

        let catalogue = MarketCatalogue::new(vec![TradingPair::new("HYDRO", "DAI")]).unwrap();
        assert_eq!(catalogue.selected().id, "HYDRO-DAI");
        assert_eq!(catalogue.pairs().len(), 1);
    }

    #[test]
    fn price_precision_by_quote() {
        assert_eq!(TradingPair::new("WETH", "DAI").price_precision(), 2);
        assert_eq!(TradingPair::new("HYDRO", "WETH").price_precision(), 6);
    }
}
