use std::fmt;

/// The counter value echoed back by the sync endpoint.
///
/// A `Count` is never stored, it lives for the duration of one request.
/// It keeps the digits it was parsed from, so integers of any magnitude echo
/// back exactly. Its [`Display`](fmt::Display) output is always a valid
/// base-10 integer literal, whatever the input it was parsed from.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Count {
    negative: bool,
    /// Decimal digits without leading zeros, empty for zero.
    digits: String,
}

impl Count {
    pub const ZERO: Count = Count {
        negative: false,
        digits: String::new(),
    };

    /// Parses the leading numeric prefix of `input`.
    ///
    /// Leading whitespace is skipped and an optional `+` or `-` sign is
    /// accepted. Parsing stops at the first non-digit. Input without any
    /// digits yields zero.
    ///
    /// ```
    /// # use counter_echo::Count;
    /// assert_eq!(Count::parse("42abc").to_i64(), Some(42));
    /// assert_eq!(Count::parse("  -7").to_string(), "-7");
    /// assert_eq!(Count::parse("abc"), Count::ZERO);
    /// ```
    pub fn parse(input: &str) -> Count {
        let input = input.trim_start();

        let (negative, rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };

        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let digits = rest[..len].trim_start_matches('0');

        Count {
            negative: negative && !digits.is_empty(),
            digits: digits.to_owned(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// The value as an `i64`, if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.to_string().parse().ok()
    }
}

impl From<i64> for Count {
    fn from(value: i64) -> Self {
        Count::parse(&value.to_string())
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.negative, self.is_zero()) {
            (_, true) => f.write_str("0"),
            (true, false) => write!(f, "-{}", self.digits),
            (false, false) => f.write_str(&self.digits),
        }
    }
}
