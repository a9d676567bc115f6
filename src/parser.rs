//! Small nom grammars: SQL identifiers and free-form dates.
//!
//! # Accepted dates
//!
//! ```text
//! 2014-01-21            2014/01/21            01/21/2014
//! 2014-01-21T16:34:02   2014-01-21 16:34      Jan 21, 2014 4:30pm
//! 21 January 2014       2014-01-21T16:34:02.250+02:00
//! ```
//!
//! A trailing offset (`Z`, `UTC`, `+02:00`, `-0500`) is applied and dropped,
//! leaving a naive UTC timestamp.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1, take_while_m_n},
    character::complete::{alpha1, char, multispace1, one_of, space0, space1},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{WinnowError, WinnowResult};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Validate a (possibly schema-qualified) table identifier.
pub fn parse_identifier(input: &str) -> WinnowResult<&str> {
    let trimmed = input.trim();
    match all_consuming(qualified_identifier)(trimmed) {
        Ok((_, ident)) => Ok(ident),
        Err(_) => Err(WinnowError::InvalidIdentifier(input.to_string())),
    }
}

/// Parse a free-form date/time string.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    all_consuming(datetime)(input.trim()).ok().map(|(_, dt)| dt)
}

fn qualified_identifier(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(char('.'), identifier_part))(input)
}

fn identifier_part(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(
            take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        recognize(delimited(char('"'), take_while1(|c: char| c != '"'), char('"'))),
    ))(input)
}

fn digits<'a, T: std::str::FromStr>(min: usize, max: usize) -> impl FnMut(&'a str) -> IResult<&'a str, T> {
    map_res(take_while_m_n(min, max, |c: char| c.is_ascii_digit()), |s: &str| s.parse::<T>())
}

fn datetime(input: &str) -> IResult<&str, NaiveDateTime> {
    map_opt(
        pair(date, opt(preceded(date_time_sep, clock))),
        |(date, clock): (NaiveDate, Option<(NaiveTime, i64)>)| match clock {
            Some((time, offset)) => date
                .and_time(time)
                .checked_sub_signed(Duration::seconds(offset)),
            None => date.and_hms_opt(0, 0, 0),
        },
    )(input)
}

fn date_time_sep(input: &str) -> IResult<&str, &str> {
    alt((
        tag("T"),
        tag("t"),
        recognize(pair(opt(char(',')), multispace1)),
    ))(input)
}

fn date(input: &str) -> IResult<&str, NaiveDate> {
    alt((iso_date, us_date, month_first_date, day_first_date))(input)
}

/// `2014-01-21`, `2014/01/21`
fn iso_date(input: &str) -> IResult<&str, NaiveDate> {
    map_opt(
        tuple((
            digits::<i32>(4, 4),
            one_of("-/"),
            digits::<u32>(1, 2),
            one_of("-/"),
            digits::<u32>(1, 2),
        )),
        |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d),
    )(input)
}

/// `01/21/2014`
fn us_date(input: &str) -> IResult<&str, NaiveDate> {
    map_opt(
        tuple((
            digits::<u32>(1, 2),
            char('/'),
            digits::<u32>(1, 2),
            char('/'),
            digits::<i32>(4, 4),
        )),
        |(m, _, d, _, y)| NaiveDate::from_ymd_opt(y, m, d),
    )(input)
}

/// `Jan 21, 2014`, `January 21st 2014`
fn month_first_date(input: &str) -> IResult<&str, NaiveDate> {
    let (input, month) = month_name(input)?;
    let (input, _) = space1(input)?;
    let (input, day) = day_of_month(input)?;
    let (input, _) = opt(char(','))(input)?;
    let (input, _) = space1(input)?;
    let (rest, year) = digits::<i32>(4, 4)(input)?;
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => Ok((rest, date)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

/// `21 January 2014`, `21 Jan, 2014`
fn day_first_date(input: &str) -> IResult<&str, NaiveDate> {
    map_opt(
        tuple((
            day_of_month,
            space1,
            month_name,
            opt(char(',')),
            space1,
            digits::<i32>(4, 4),
        )),
        |(d, _, m, _, _, y)| NaiveDate::from_ymd_opt(y, m, d),
    )(input)
}

fn day_of_month(input: &str) -> IResult<&str, u32> {
    let (input, day) = digits::<u32>(1, 2)(input)?;
    let (input, _) = opt(alt((
        tag_no_case("st"),
        tag_no_case("nd"),
        tag_no_case("rd"),
        tag_no_case("th"),
    )))(input)?;
    Ok((input, day))
}

fn month_name(input: &str) -> IResult<&str, u32> {
    let (input, month) = map_opt(alpha1, month_number)(input)?;
    let (input, _) = opt(char('.'))(input)?;
    Ok((input, month))
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| month.starts_with(&name))
        .map(|ix| ix as u32 + 1)
}

/// Time of day plus the UTC offset in seconds (0 when absent).
fn clock(input: &str) -> IResult<&str, (NaiveTime, i64)> {
    let (input, time) = time_of_day(input)?;
    let (input, offset) = opt(preceded(space0, utc_offset))(input)?;
    Ok((input, (time, offset.unwrap_or(0))))
}

fn time_of_day(input: &str) -> IResult<&str, NaiveTime> {
    map_opt(
        tuple((
            digits::<u32>(1, 2),
            char(':'),
            digits::<u32>(2, 2),
            opt(preceded(char(':'), digits::<u32>(2, 2))),
            opt(preceded(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
            opt(preceded(space0, meridiem)),
        )),
        |(hour, _, minute, second, fraction, pm)| {
            let hour = match pm {
                None => hour,
                Some(_) if hour == 0 || hour > 12 => return None,
                Some(false) => hour % 12,
                Some(true) => hour % 12 + 12,
            };
            let nanos = fraction.map(fraction_nanos).unwrap_or(0);
            NaiveTime::from_hms_nano_opt(hour, minute, second.unwrap_or(0), nanos)
        },
    )(input)
}

/// `true` for pm.
fn meridiem(input: &str) -> IResult<&str, bool> {
    alt((
        value(false, tag_no_case("am")),
        value(true, tag_no_case("pm")),
    ))(input)
}

fn fraction_nanos(digits: &str) -> u32 {
    let mut nanos = 0u32;
    for (i, c) in digits.chars().take(9).enumerate() {
        nanos += c.to_digit(10).unwrap_or(0) * 10u32.pow(8 - i as u32);
    }
    nanos
}

fn utc_offset(input: &str) -> IResult<&str, i64> {
    alt((
        value(0, alt((tag_no_case("z"), tag_no_case("utc"), tag_no_case("gmt")))),
        map(
            tuple((
                one_of("+-"),
                digits::<i64>(2, 2),
                opt(char(':')),
                digits::<i64>(2, 2),
            )),
            |(sign, h, _, m)| {
                let secs = h * 3600 + m * 60;
                if sign == '-' { -secs } else { secs }
            },
        ),
    ))(input)
}
