//! Instruction prompts sent to the model provider
//!
//! The receipt prompt pins the output JSON shape and the closed category
//! label set. Downstream consumers depend on both, so treat any edit here as
//! an interface change, not copy tweaking.

/// Instruction text accompanying every receipt image submission.
pub const PARSE_RECEIPT: &str = include_str!("../../../prompts/parse_receipt.md");

/// Category labels the model is instructed to choose from. The analysis
/// response is returned verbatim, so these are not enforced on the way out;
/// they exist for prompt construction and for tests that guard the contract.
pub const CATEGORIES: &[&str] = &[
    "Food & Drink",
    "Travel",
    "Accommodation",
    "Office Supplies",
    "Utilities",
    "Entertainment",
    "Other",
];
