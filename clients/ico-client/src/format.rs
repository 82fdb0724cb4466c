//! Display helpers for base-unit amounts.

use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Decimal places of SOL (`LAMPORTS_PER_SOL` = 10^9).
pub const SOL_DECIMALS: u32 = LAMPORTS_PER_SOL.ilog10();

/// Decimal places shown for SOL-denominated amounts.
pub const SOL_DISPLAY_DECIMALS: u32 = 4;

/// Render `amount` base units with `decimals` implied places, rounded
/// half-up to `shown` places. Integer math only.
pub fn format_units(amount: u64, decimals: u32, shown: u32) -> String {
    let shown = shown.min(decimals);
    // Any step past u128 exceeds u64::MAX, so the amount rounds to zero.
    let rounded = match 10u128.checked_pow(decimals - shown) {
        Some(step) => (amount as u128 + step / 2) / step,
        None => 0,
    };

    if shown == 0 {
        return rounded.to_string();
    }
    let (whole, fraction) = match 10u128.checked_pow(shown) {
        Some(scale) => (rounded / scale, rounded % scale),
        None => (0, rounded),
    };
    format!("{whole}.{fraction:0width$}", width = shown as usize)
}

/// Lamports as SOL with four decimals, e.g. `1_500_000_000` -> `"1.5000"`.
pub fn format_sol(lamports: u64) -> String {
    format_units(lamports, SOL_DECIMALS, SOL_DISPLAY_DECIMALS)
}
