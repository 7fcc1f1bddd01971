use tracing::debug;

use common::{BotParameters, Candle, Instrument, OrderIntent, Signal};

/// Truncate `num` toward zero at `precision` decimal places.
///
/// This is not rounding: `truncate_to_precision(1.23456, 3) == 1.234`.
/// The broker rejects prices with more decimals than the instrument allows.
pub fn truncate_to_precision(num: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (num * factor).trunc() / factor
}

/// Turn a signal into a sized market order with take-profit and stop-loss.
///
/// Units are `floor(volume_factor / price)`, using the bid close for longs
/// and the ask close for shorts, and are negated for shorts. Returns `None`
/// for `Signal::Neutral` and when the size comes out at zero, negative or
/// non-finite (degenerate prices, or an instrument too expensive for the
/// configured volume).
pub fn build_order(
    signal: Signal,
    last: &Candle,
    instrument: &Instrument,
    params: &BotParameters,
) -> Option<OrderIntent> {
    let (units, take_profit, stop_loss) = match signal {
        Signal::Long => {
            let units = whole_units(last.bid.close, params.volume_factor)?;
            let tp = last.ask.close + last.ask.close * params.take_profit_factor;
            let sl = last.bid.close - last.bid.close * params.stop_loss_factor;
            (units, tp, sl)
        }
        Signal::Short => {
            let units = whole_units(last.ask.close, params.volume_factor)?;
            let tp = last.bid.close - last.bid.close * params.take_profit_factor;
            let sl = last.ask.close + last.ask.close * params.stop_loss_factor;
            (-units, tp, sl)
        }
        Signal::Neutral => return None,
    };

    let precision = instrument.display_precision;
    let order = OrderIntent::market(
        instrument.name.clone(),
        units,
        truncate_to_precision(take_profit, precision),
        truncate_to_precision(stop_loss, precision),
        precision,
    );
    debug!(
        instrument = %order.instrument,
        units = order.units,
        tp = order.take_profit,
        sl = order.stop_loss,
        "Built order"
    );
    Some(order)
}

fn whole_units(price: f64, volume_factor: f64) -> Option<i64> {
    let units = ((1.0 / price) * volume_factor).floor();
    if !units.is_finite() || units <= 0.0 || units > i64::MAX as f64 {
        return None;
    }
    Some(units as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::PriceBar;

    fn params(volume_factor: f64) -> BotParameters {
        BotParameters {
            candle_granularity: "M1".into(),
            candle_count: 500,
            momentum_period: 20,
            sma_period: 50,
            rsi_period: 14,
            stdev_period: 20,
            volume_factor,
            take_profit_factor: 0.125,
            stop_loss_factor: 0.0625,
        }
    }

    fn candle(bid: f64, ask: f64) -> Candle {
        Candle {
            time: Utc::now(),
            complete: true,
            volume: 1,
            bid: PriceBar::flat(bid),
            ask: PriceBar::flat(ask),
            mid: PriceBar::flat((bid + ask) / 2.0),
        }
    }

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(truncate_to_precision(1.23456, 3), 1.234);
        assert_eq!(truncate_to_precision(1.23999, 2), 1.23);
        assert_eq!(truncate_to_precision(-1.23456, 3), -1.234);
        assert_eq!(truncate_to_precision(157.5, 0), 157.0);
    }

    #[test]
    fn long_size_from_bid() {
        let instrument = Instrument::currency("EUR_USD", 5);
        let order = build_order(Signal::Long, &candle(1.2, 1.25), &instrument, &params(100.0)).unwrap();
        assert_eq!(order.units, 83);
        assert_eq!(order.instrument, "EUR_USD");
        assert_eq!(order.price_precision, 5);
    }

    #[test]
    fn long_levels_from_ask_and_bid() {
        let instrument = Instrument::currency("EUR_USD", 3);
        let order = build_order(Signal::Long, &candle(1.0, 1.25), &instrument, &params(100.0)).unwrap();
        // tp = 1.25 * 1.125 = 1.40625 -> 1.406, sl = 1.0 * 0.9375 -> 0.937
        assert_eq!(order.take_profit, 1.406);
        assert_eq!(order.stop_loss, 0.937);
        assert!(order.take_profit > order.stop_loss);
    }

    #[test]
    fn short_size_from_ask_is_negative() {
        let instrument = Instrument::currency("EUR_USD", 3);
        let order = build_order(Signal::Short, &candle(1.0, 1.25), &instrument, &params(100.0)).unwrap();
        // floor(100 / 1.25) = 80
        assert_eq!(order.units, -80);
        // tp = 1.0 * 0.875, sl = 1.25 * 1.0625 = 1.328125 -> 1.328
        assert_eq!(order.take_profit, 0.875);
        assert_eq!(order.stop_loss, 1.328);
        assert_eq!(order.signal(), Signal::Short);
    }

    #[test]
    fn zero_size_declines() {
        let instrument = Instrument::currency("EUR_USD", 5);
        assert!(build_order(Signal::Long, &candle(1.2, 1.25), &instrument, &params(1.0)).is_none());
        assert!(build_order(Signal::Short, &candle(1.2, 1.25), &instrument, &params(1.0)).is_none());
    }

    #[test]
    fn degenerate_prices_decline() {
        let instrument = Instrument::currency("EUR_USD", 5);
        assert!(build_order(Signal::Long, &candle(0.0, 0.0), &instrument, &params(100.0)).is_none());
        assert!(build_order(Signal::Short, &candle(-1.0, -1.0), &instrument, &params(100.0)).is_none());
        assert!(build_order(Signal::Long, &candle(f64::NAN, 1.0), &instrument, &params(100.0)).is_none());
        assert!(build_order(Signal::Long, &candle(1.2, 1.25), &instrument, &params(-100.0)).is_none());
    }

    #[test]
    fn neutral_never_builds() {
        let instrument = Instrument::currency("EUR_USD", 5);
        assert!(build_order(Signal::Neutral, &candle(1.2, 1.25), &instrument, &params(100.0)).is_none());
    }
}
