//! Per-model token pricing
//!
//! Lookup is by model-name prefix, first match in declaration order, so
//! specific prefixes are declared before general ones. Unknown models cost 0.

/// Prompt size above which tiered prices switch to the upper tier
pub const LONG_CONTEXT_THRESHOLD: u32 = 128_000;

const fn per_million(usd: f64) -> f64 {
    usd / 1_000_000.0
}

/// USD per token for input and output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPrice {
    pub input: f64,
    pub output: f64,
}

impl TokenPrice {
    const fn per_million(input: f64, output: f64) -> Self {
        Self {
            input: per_million(input),
            output: per_million(output),
        }
    }
}

/// Price schedule for a model family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Same price regardless of prompt size
    Flat(TokenPrice),
    /// Tier chosen by the prompt token count alone
    Tiered {
        threshold: u32,
        below: TokenPrice,
        above: TokenPrice,
    },
}

impl Rate {
    fn price_for(&self, prompt_tokens: u32) -> TokenPrice {
        match *self {
            Self::Flat(price) => price,
            Self::Tiered { threshold, below, above } => {
                if prompt_tokens > threshold {
                    above
                } else {
                    below
                }
            }
        }
    }
}

/// Ordered prefix table for one vendor
#[derive(Debug)]
pub struct PricingTable {
    entries: &'static [(&'static str, Rate)],
}

impl PricingTable {
    pub const fn new(entries: &'static [(&'static str, Rate)]) -> Self {
        Self { entries }
    }

    /// Rate for the first entry whose prefix matches `model`
    pub fn rate(&self, model: &str) -> Option<Rate> {
        self.entries
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
            .map(|(_, rate)| *rate)
    }

    /// Cost in USD; 0 for models without a price
    pub fn cost(&self, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        self.rate(model).map_or(0.0, |rate| {
            let price = rate.price_for(prompt_tokens);
            f64::from(prompt_tokens) * price.input + f64::from(completion_tokens) * price.output
        })
    }
}

pub static OPENAI: PricingTable = PricingTable::new(&[
    ("gpt-4o-mini", Rate::Flat(TokenPrice::per_million(0.15, 0.60))),
    ("gpt-4o", Rate::Flat(TokenPrice::per_million(5.0, 15.0))),
    ("gpt-4-turbo", Rate::Flat(TokenPrice::per_million(10.0, 30.0))),
    ("gpt-4", Rate::Flat(TokenPrice::per_million(30.0, 60.0))),
    ("gpt-3.5-turbo", Rate::Flat(TokenPrice::per_million(0.50, 1.50))),
]);

pub static CLAUDE: PricingTable = PricingTable::new(&[
    ("claude-3-5-sonnet", Rate::Flat(TokenPrice::per_million(3.0, 15.0))),
    ("claude-3-opus", Rate::Flat(TokenPrice::per_million(15.0, 75.0))),
    ("claude-3-sonnet", Rate::Flat(TokenPrice::per_million(3.0, 15.0))),
    ("claude-3-haiku", Rate::Flat(TokenPrice::per_million(0.25, 1.25))),
]);

pub static GEMINI: PricingTable = PricingTable::new(&[
    (
        "gemini-1.5-pro",
        Rate::Tiered {
            threshold: LONG_CONTEXT_THRESHOLD,
            below: TokenPrice::per_million(3.50, 10.50),
            above: TokenPrice::per_million(7.0, 21.0),
        },
    ),
    (
        "gemini-1.5-flash",
        Rate::Tiered {
            threshold: LONG_CONTEXT_THRESHOLD,
            below: TokenPrice::per_million(0.35, 1.05),
            above: TokenPrice::per_million(0.70, 2.10),
        },
    ),
    ("gemini-1.0-pro", Rate::Flat(TokenPrice::per_million(0.50, 1.50))),
]);

/// The mock vendor is free
pub static MOCK: PricingTable = PricingTable::new(&[]);
