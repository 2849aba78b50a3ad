//! Plugin output parsing (spec §4.3): a leading short line, an optional
//! long-output block, and a trailing `|perfdata` segment whose tokens are
//! whitespace-separated `label=value[unit];warn;crit;min;max` entries.

use clustermon_types::PerfDataPoint;

pub struct ParsedOutput {
    pub short: String,
    pub long: String,
    pub perfdata: Vec<PerfDataPoint>,
}

pub fn parse(raw: &str) -> ParsedOutput {
    let (body, perf_segment) = match raw.find('|') {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    };

    let mut lines = body.splitn(2, '\n');
    let short = lines.next().unwrap_or("").trim_end().to_string();
    let long = lines.next().unwrap_or("").trim().to_string();

    let perfdata = perf_segment.map(parse_perfdata).unwrap_or_default();

    ParsedOutput { short, long, perfdata }
}

fn parse_perfdata(segment: &str) -> Vec<PerfDataPoint> {
    segment.split_whitespace().filter_map(parse_perf_token).collect()
}

fn parse_perf_token(token: &str) -> Option<PerfDataPoint> {
    let (label, rest) = token.split_once('=')?;
    if label.is_empty() {
        return None;
    }
    let mut fields = rest.split(';');
    let value_and_unit = fields.next()?;
    let warn = fields.next().filter(|s| !s.is_empty()).map(str::to_string);
    let crit = fields.next().filter(|s| !s.is_empty()).map(str::to_string);
    let min = fields.next().and_then(|s| s.parse().ok());
    let max = fields.next().and_then(|s| s.parse().ok());

    let split_at = value_and_unit.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+')).unwrap_or(value_and_unit.len());
    let (value_str, unit) = value_and_unit.split_at(split_at);
    let value = value_str.parse().ok()?;

    Some(PerfDataPoint {
        label: label.to_string(),
        value,
        unit: unit.to_string(),
        warn,
        crit,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_output_only() {
        let p = parse("OK - all good");
        assert_eq!(p.short, "OK - all good");
        assert_eq!(p.long, "");
        assert!(p.perfdata.is_empty());
    }

    #[test]
    fn parses_long_output_block() {
        let p = parse("OK - summary\ndetail line one\ndetail line two");
        assert_eq!(p.short, "OK - summary");
        assert_eq!(p.long, "detail line one\ndetail line two");
    }

    #[test]
    fn parses_perfdata_segment() {
        let p = parse("OK - load fine|load1=0.50;1.0;2.0;0;4 load5=0.30");
        assert_eq!(p.short, "OK - load fine");
        assert_eq!(p.perfdata.len(), 2);
        assert_eq!(p.perfdata[0].label, "load1");
        assert_eq!(p.perfdata[0].value, 0.50);
        assert_eq!(p.perfdata[0].warn.as_deref(), Some("1.0"));
        assert_eq!(p.perfdata[0].crit.as_deref(), Some("2.0"));
        assert_eq!(p.perfdata[0].min, Some(0.0));
        assert_eq!(p.perfdata[0].max, Some(4.0));
        assert_eq!(p.perfdata[1].label, "load5");
        assert_eq!(p.perfdata[1].value, 0.30);
        assert!(p.perfdata[1].warn.is_none());
    }

    #[test]
    fn parses_perfdata_with_unit() {
        let p = parse("OK|time=120ms;500;1000");
        assert_eq!(p.perfdata[0].unit, "ms");
        assert_eq!(p.perfdata[0].value, 120.0);
    }

    #[test]
    fn ignores_malformed_perf_tokens() {
        let p = parse("OK|notanumber=abc valid=1");
        assert_eq!(p.perfdata.len(), 1);
        assert_eq!(p.perfdata[0].label, "valid");
    }
}
