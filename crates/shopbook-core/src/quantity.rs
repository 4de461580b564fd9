//! # Quantity Codec
//!
//! Converts between raw integer line-counts and the human-facing
//! "cartons + lines" notation, parameterized by a per-product
//! `lines_per_carton` divisor.
//!
//! ## The Carton/Line Encoding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MIXED-RADIX STOCK NOTATION                                             │
//! │                                                                         │
//! │  Stored:    one signed integer, the total LINE count                    │
//! │  Displayed: "2C3L"  =  2 cartons + 3 loose lines                        │
//! │                                                                         │
//! │  With lines_per_carton = 6:                                             │
//! │    15 lines  ──►  15 div 6 = 2 cartons, 15 mod 6 = 3 lines  ──► "2C3L" │
//! │    12 lines  ──►  "2C"      (no loose lines)                            │
//! │     3 lines  ──►  "3L"      (no full carton)                            │
//! │     0 lines  ──►  "0"                                                   │
//! │                                                                         │
//! │  With lines_per_carton = 1 the notation is redundant, so quantities    │
//! │  render as plain integers.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopbook_core::quantity::Packing;
//!
//! let packing = Packing::of(6);
//! assert_eq!(packing.format_lines(15), "2C3L");
//! assert_eq!(packing.parse_lines("2C3L").unwrap(), 15);
//! assert_eq!(packing.to_lines(2), 12);
//! ```
//!
//! ## Round-Trip Invariant
//! For every non-negative integer `n` and divisor `d >= 2`:
//! `parse_lines(format_lines(n)) == n`. The display string for a given
//! `(n, d)` pair is unique.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_lines_per_carton;

// =============================================================================
// Packing
// =============================================================================

/// A product's carton packing: how many lines fit in one carton.
///
/// ## Design Decisions
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Logically immutable**: once a product has stock movements, changing
///   its packing would retroactively change the meaning of every historical
///   quantity string. The db layer enforces this.
///
/// ## Valid Range
/// Catalog validation accepts 1..=8 (`validate_lines_per_carton`). The
/// codec itself stays total for any value: a divisor `<= 1` degrades to
/// plain-integer display, and the price conversions clamp a divisor `<= 0`
/// to a zero result instead of dividing by zero, matching the legacy
/// system's guard behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Packing(i64);

impl Packing {
    /// Creates a validated packing (divisor in 1..=8).
    pub fn new(lines_per_carton: i64) -> Result<Self, ValidationError> {
        validate_lines_per_carton(lines_per_carton)?;
        Ok(Packing(lines_per_carton))
    }

    /// Creates a packing from a raw `lines_per_carton` divisor without
    /// validation, for values already checked at the catalog boundary.
    #[inline]
    pub const fn of(lines_per_carton: i64) -> Self {
        Packing(lines_per_carton)
    }

    /// Returns the divisor: lines per carton.
    #[inline]
    pub const fn lines_per_carton(&self) -> i64 {
        self.0
    }

    /// Converts a carton count to a line count.
    ///
    /// ## Example
    /// ```rust
    /// use shopbook_core::quantity::Packing;
    ///
    /// assert_eq!(Packing::of(6).to_lines(2), 12);
    /// ```
    #[inline]
    pub const fn to_lines(&self, cartons: i64) -> i64 {
        cartons * self.0
    }

    /// Formats a total line count as a carton/line display string.
    ///
    /// ## Behavior
    /// - divisor `<= 1`: plain decimal string (carton notation is redundant)
    /// - otherwise floor-divide into cartons and lines:
    ///   - both nonzero  → `"{c}C{l}L"`
    ///   - only cartons  → `"{c}C"`
    ///   - only lines    → `"{l}L"`
    ///   - both zero     → `"0"`
    ///
    /// Total and deterministic: every integer maps to exactly one string
    /// for a given divisor.
    pub fn format_lines(&self, total_lines: i64) -> String {
        if self.0 <= 1 {
            return total_lines.to_string();
        }

        // Euclidean div/mod keeps lines in 0..divisor even for negative
        // totals, which only arise from adjustment ledger sums.
        let cartons = total_lines.div_euclid(self.0);
        let lines = total_lines.rem_euclid(self.0);

        match (cartons != 0, lines != 0) {
            (true, true) => format!("{cartons}C{lines}L"),
            (true, false) => format!("{cartons}C"),
            (false, true) => format!("{lines}L"),
            (false, false) => "0".to_string(),
        }
    }

    /// Parses a carton/line string back into a total line count.
    ///
    /// Accepts the exact output grammar of [`format_lines`](Self::format_lines)
    /// plus a bare integer meaning raw lines:
    /// `"<int>C<int>L"`, `"<int>C"`, `"<int>L"`, `"<int>"`.
    /// Lowercase unit letters are tolerated since this feeds the
    /// stock-control input form.
    ///
    /// ## Errors
    /// `CoreError::Parse` on malformed input: empty string, negative
    /// numbers, letters out of order, trailing garbage.
    pub fn parse_lines(&self, input: &str) -> CoreResult<i64> {
        let s = input.trim();

        if s.is_empty() {
            return Err(CoreError::Parse {
                input: input.to_string(),
                reason: "empty string".to_string(),
            });
        }

        // Bare integer = raw line count.
        if let Ok(n) = s.parse::<i64>() {
            if n < 0 {
                return Err(CoreError::Parse {
                    input: input.to_string(),
                    reason: "quantity cannot be negative".to_string(),
                });
            }
            return Ok(n);
        }

        let caps = carton_line_re()
            .captures(s)
            .ok_or_else(|| CoreError::Parse {
                input: input.to_string(),
                reason: "expected <n>C<n>L, <n>C, <n>L, or a bare line count".to_string(),
            })?;

        let cartons = match caps.get(1) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| CoreError::Parse {
                input: input.to_string(),
                reason: "carton count out of range".to_string(),
            })?,
            None => 0,
        };
        let lines = match caps.get(2) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| CoreError::Parse {
                input: input.to_string(),
                reason: "line count out of range".to_string(),
            })?,
            None => 0,
        };

        // The regex permits the all-empty match; a string that reached this
        // point without either group is malformed ("CL", "C3L", ...).
        if caps.get(1).is_none() && caps.get(2).is_none() {
            return Err(CoreError::Parse {
                input: input.to_string(),
                reason: "expected <n>C<n>L, <n>C, <n>L, or a bare line count".to_string(),
            });
        }

        Ok(cartons * self.0 + lines)
    }

    /// Converts a per-line price to the per-carton price shown to the user.
    ///
    /// Returns `0.0` when the divisor is `<= 0`. That clamp guards the
    /// downstream divide in [`price_per_line`](Self::price_per_line) and
    /// matches the legacy system; catalog validation fails loudly long
    /// before a zero divisor reaches here.
    #[inline]
    pub fn price_per_carton(&self, price_per_line: f64) -> f64 {
        if self.0 <= 0 {
            return 0.0;
        }
        price_per_line * self.0 as f64
    }

    /// Converts a per-carton price (the display/input unit) to the stored
    /// per-line price.
    ///
    /// Division is real-valued: fractional per-line prices are expected and
    /// preserved at full precision. Rounding happens only at final display.
    /// Returns `0.0` when the divisor is `<= 0`.
    #[inline]
    pub fn price_per_line(&self, price_per_carton: f64) -> f64 {
        if self.0 <= 0 {
            return 0.0;
        }
        price_per_carton / self.0 as f64
    }
}

/// Matches the full carton/line grammar: optional `<n>C` then optional `<n>L`.
fn carton_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(\d+)[Cc])?(?:(\d+)[Ll])?$").expect("static regex"))
}

// =============================================================================
// Formatted-Quantity Aggregation
// =============================================================================

/// Joins several products' formatted quantities for display.
///
/// Drops entries equal to `"0"`, joins survivors with `" + "`, and returns
/// `"0"` when nothing survives. This does NOT add quantities numerically -
/// it is string concatenation for heterogeneous per-product breakdowns
/// (each component may use a different packing).
///
/// ## Example
/// ```rust
/// use shopbook_core::quantity::combine_formatted;
///
/// assert_eq!(combine_formatted(&["2C1L", "0", "1C"]), "2C1L + 1C");
/// assert_eq!(combine_formatted(&["0"]), "0");
/// ```
pub fn combine_formatted<S: AsRef<str>>(parts: &[S]) -> String {
    let survivors: Vec<&str> = parts
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty() && *p != "0")
        .collect();

    if survivors.is_empty() {
        "0".to_string()
    } else {
        survivors.join(" + ")
    }
}

/// Numerically sums formatted quantities the way the legacy system did.
///
/// ## Legacy-Compatible, Unit-UNAWARE
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Every "<n>C" token is added to a carton accumulator and every          │
/// │  "<n>L" token to a line accumulator, WITHOUT converting through any     │
/// │  product's lines_per_carton. A bare standalone integer counts as        │
/// │  cartons. Cartons of 6-line products and 8-line products are added      │
/// │  as if comparable.                                                      │
/// │                                                                         │
/// │  This faithfully reproduces the reference behavior for report           │
/// │  compatibility. For a unit-correct total, use `unit_sum_lines`.         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn legacy_sum_formatted<S: AsRef<str>>(parts: &[S]) -> String {
    static C_RE: OnceLock<Regex> = OnceLock::new();
    static L_RE: OnceLock<Regex> = OnceLock::new();
    let c_re = C_RE.get_or_init(|| Regex::new(r"(\d+)[Cc]").expect("static regex"));
    let l_re = L_RE.get_or_init(|| Regex::new(r"(\d+)[Ll]").expect("static regex"));

    let mut total_cartons: i64 = 0;
    let mut total_lines: i64 = 0;

    for part in parts {
        let part = part.as_ref().trim();

        for cap in c_re.captures_iter(part) {
            total_cartons += cap[1].parse::<i64>().unwrap_or(0);
        }
        for cap in l_re.captures_iter(part) {
            total_lines += cap[1].parse::<i64>().unwrap_or(0);
        }

        // A bare standalone integer is treated as additional cartons.
        if let Ok(n) = part.parse::<i64>() {
            total_cartons += n;
        }
    }

    match (total_cartons != 0, total_lines != 0) {
        (true, true) => format!("{total_cartons}C{total_lines}L"),
        (true, false) => format!("{total_cartons}C"),
        (false, true) => format!("{total_lines}L"),
        (false, false) => "0".to_string(),
    }
}

/// Unit-correct sum: parses each formatted quantity with its own packing
/// and returns the total raw line count.
///
/// Offered alongside [`legacy_sum_formatted`] so callers can choose between
/// report compatibility and arithmetic correctness.
pub fn unit_sum_lines<'a, I>(parts: I) -> CoreResult<i64>
where
    I: IntoIterator<Item = (&'a str, Packing)>,
{
    let mut total = 0i64;
    for (formatted, packing) in parts {
        total += packing.parse_lines(formatted)?;
    }
    Ok(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_divisor() {
        assert!(Packing::new(6).is_ok());
        assert!(Packing::new(1).is_ok());
        assert!(Packing::new(8).is_ok());
        assert!(Packing::new(0).is_err());
        assert!(Packing::new(9).is_err());
    }

    #[test]
    fn test_to_lines() {
        assert_eq!(Packing::of(6).to_lines(2), 12);
        assert_eq!(Packing::of(6).to_lines(0), 0);
        assert_eq!(Packing::of(1).to_lines(7), 7);
    }

    #[test]
    fn test_format_lines_mixed() {
        let packing = Packing::of(6);
        assert_eq!(packing.format_lines(15), "2C3L");
        assert_eq!(packing.format_lines(12), "2C");
        assert_eq!(packing.format_lines(3), "3L");
        assert_eq!(packing.format_lines(0), "0");
    }

    #[test]
    fn test_format_lines_unit_packing_is_plain_integer() {
        let packing = Packing::of(1);
        assert_eq!(packing.format_lines(0), "0");
        assert_eq!(packing.format_lines(7), "7");
        assert_eq!(packing.format_lines(123), "123");
    }

    #[test]
    fn test_format_zero_is_zero_for_any_divisor() {
        for d in [1, 2, 3, 6, 8] {
            assert_eq!(Packing::of(d).format_lines(0), "0");
        }
    }

    #[test]
    fn test_parse_lines_grammar() {
        let packing = Packing::of(6);
        assert_eq!(packing.parse_lines("2C3L").unwrap(), 15);
        assert_eq!(packing.parse_lines("2C").unwrap(), 12);
        assert_eq!(packing.parse_lines("3L").unwrap(), 3);
        assert_eq!(packing.parse_lines("15").unwrap(), 15);
        assert_eq!(packing.parse_lines("0").unwrap(), 0);
        // Forgiving about case and surrounding whitespace (form input).
        assert_eq!(packing.parse_lines(" 2c3l ").unwrap(), 15);
    }

    #[test]
    fn test_parse_lines_rejects_malformed() {
        let packing = Packing::of(6);
        assert!(packing.parse_lines("").is_err());
        assert!(packing.parse_lines("   ").is_err());
        assert!(packing.parse_lines("3L2C").is_err()); // letters out of order
        assert!(packing.parse_lines("-1").is_err()); // negative
        assert!(packing.parse_lines("-2C").is_err());
        assert!(packing.parse_lines("CL").is_err()); // no digits
        assert!(packing.parse_lines("2C3").is_err()); // trailing garbage
        assert!(packing.parse_lines("2C3L4").is_err());
        assert!(packing.parse_lines("two cartons").is_err());
    }

    /// Round-trip invariant: parse(format(n)) == n for all n >= 0, d >= 2.
    #[test]
    fn test_round_trip() {
        for d in 2..=8 {
            let packing = Packing::of(d);
            for n in 0..=200 {
                let formatted = packing.format_lines(n);
                assert_eq!(
                    packing.parse_lines(&formatted).unwrap(),
                    n,
                    "round-trip failed for n={n}, d={d} (formatted {formatted:?})"
                );
            }
        }
    }

    #[test]
    fn test_price_per_line_full_precision() {
        let packing = Packing::of(6);
        let per_line = packing.price_per_line(1.0);
        // 1/6 is not representable in decimal; the codec must not round.
        assert!((per_line - 1.0 / 6.0).abs() < 1e-12);

        // Round-trips within floating tolerance.
        let recovered = packing.price_per_carton(per_line);
        assert!((recovered - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_guards_clamp_to_zero() {
        let broken = Packing::of(0);
        assert_eq!(broken.price_per_carton(10.0), 0.0);
        assert_eq!(broken.price_per_line(10.0), 0.0);

        let negative = Packing::of(-3);
        assert_eq!(negative.price_per_carton(10.0), 0.0);
        assert_eq!(negative.price_per_line(10.0), 0.0);
    }

    #[test]
    fn test_price_round_trip_for_each_divisor() {
        for d in 1..=8 {
            let packing = Packing::of(d);
            let per_carton = 13.37;
            let recovered = packing.price_per_carton(packing.price_per_line(per_carton));
            assert!(
                (recovered - per_carton).abs() < 1e-9,
                "price round-trip failed for d={d}"
            );
        }
    }

    #[test]
    fn test_combine_formatted() {
        assert_eq!(combine_formatted(&["2C1L", "0", "1C"]), "2C1L + 1C");
        assert_eq!(combine_formatted(&["0"]), "0");
        assert_eq!(combine_formatted::<&str>(&[]), "0");
        assert_eq!(combine_formatted(&["0", "0", "0"]), "0");
        assert_eq!(combine_formatted(&["5L"]), "5L");
    }

    #[test]
    fn test_legacy_sum_is_unit_unaware() {
        // 2C1L + 1C2L = 3C3L regardless of each product's packing.
        assert_eq!(legacy_sum_formatted(&["2C1L", "1C2L"]), "3C3L");
        // A bare integer counts as cartons.
        assert_eq!(legacy_sum_formatted(&["2C", "3"]), "5C");
        assert_eq!(legacy_sum_formatted(&["4L", "2L"]), "6L");
        assert_eq!(legacy_sum_formatted::<&str>(&[]), "0");
        assert_eq!(legacy_sum_formatted(&["0"]), "0");
        // No carry: 5C9L stays 5C9L - the accumulators never convert.
        assert_eq!(legacy_sum_formatted(&["2C4L", "3C5L"]), "5C9L");
    }

    #[test]
    fn test_unit_sum_lines_converts_per_packing() {
        // "2C1L" at 6/carton = 13 lines; "1C2L" at 8/carton = 10 lines.
        let total = unit_sum_lines([("2C1L", Packing::of(6)), ("1C2L", Packing::of(8))]).unwrap();
        assert_eq!(total, 23);

        assert!(unit_sum_lines([("garbage", Packing::of(6))]).is_err());
    }
}
