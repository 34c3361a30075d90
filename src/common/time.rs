// src/common/time.rs
//
// Conversões entre horário de parede e minutos desde a meia-noite,
// sempre no fuso civil fixo do negócio.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Passo padrão da grade de horários oferecidos.
pub const DEFAULT_STEP: i32 = 30;

/// `"HH:MM"` (ou `"HH:MM:SS"`, como o Postgres devolve `TIME`) para minutos.
/// Entrada vazia ou malformada vale 0. `"24:00"` é o fim do dia (1440);
/// qualquer outro horário com hora 24 é malformado.
pub fn time_to_minutes(time: &str) -> i32 {
    let mut parts = time.trim().split(':');
    let hours = parts.next().and_then(|h| h.trim().parse::<i32>().ok());
    let minutes = parts.next().and_then(|m| m.trim().parse::<i32>().ok());

    match (hours, minutes) {
        (Some(h), Some(m)) if (0..24).contains(&h) && (0..60).contains(&m) => h * 60 + m,
        (Some(24), Some(0)) => MINUTES_PER_DAY,
        _ => 0,
    }
}

/// Inverso de `time_to_minutes`. Espera valores dentro de um único dia;
/// exatamente 1440 vira `"24:00"`, como o `TIME` do Postgres, para que um
/// bloco terminando à meia-noite não pareça terminar antes de começar.
pub fn minutes_to_time(minutes: i32) -> String {
    if minutes == MINUTES_PER_DAY {
        return "24:00".to_string();
    }
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn add_minutes(time: &str, delta: i32) -> String {
    minutes_to_time(time_to_minutes(time) + delta)
}

/// Parse estrito, para payloads: diferente de `time_to_minutes`,
/// recusa entradas malformadas em vez de cair para 0.
pub fn parse_time_strict(time: &str) -> Option<i32> {
    let (h, m) = time.trim().split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    ((0..24).contains(&h) && (0..60).contains(&m)).then_some(h * 60 + m)
}

/// Arredonda para cima até o próximo múltiplo de `step`.
pub fn round_up_to_step(minutes: i32, step: i32) -> i32 {
    if step <= 0 {
        return minutes;
    }
    let rem = minutes.rem_euclid(step);
    if rem == 0 { minutes } else { minutes - rem + step }
}

/// Domingo = 0 ... Sábado = 6.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Relógio ancorado no fuso civil do negócio, independente do fuso da máquina.
#[derive(Debug, Clone)]
pub struct CivilClock {
    tz: Tz,
    frozen_at: Option<DateTime<Utc>>,
}

impl CivilClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz, frozen_at: None }
    }

    /// Relógio parado num instante fixo (testes e reprocessamentos).
    pub fn frozen(tz: Tz, instant: DateTime<Utc>) -> Self {
        Self { tz, frozen_at: Some(instant) }
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.frozen_at.unwrap_or_else(Utc::now)
    }

    /// "Hoje" e "agora" (minutos desde a meia-noite) no fuso do negócio.
    pub fn current_date_and_minutes(&self) -> (NaiveDate, i32) {
        let local = self.now_utc().with_timezone(&self.tz);
        let minutes = (local.hour() * 60 + local.minute()) as i32;
        (local.date_naive(), minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_and_formats_wall_clock_times() {
        assert_eq!(time_to_minutes("08:00"), 480);
        assert_eq!(time_to_minutes("17:30"), 1050);
        assert_eq!(time_to_minutes("09:05:00"), 545);
        assert_eq!(minutes_to_time(545), "09:05");
        assert_eq!(minutes_to_time(0), "00:00");
        assert_eq!(add_minutes("09:30", 45), "10:15");
    }

    #[test]
    fn malformed_times_fall_back_to_zero() {
        assert_eq!(time_to_minutes(""), 0);
        assert_eq!(time_to_minutes("abc"), 0);
        assert_eq!(time_to_minutes("10"), 0);
        assert_eq!(time_to_minutes("10:75"), 0);
        assert_eq!(time_to_minutes("24:59"), 0);
        assert_eq!(time_to_minutes("24:30"), 0);
        assert_eq!(time_to_minutes("25:00"), 0);
    }

    #[test]
    fn midnight_closing_round_trips_as_end_of_day() {
        assert_eq!(time_to_minutes("24:00"), 1440);
        assert_eq!(time_to_minutes("24:00:00"), 1440);
        assert_eq!(minutes_to_time(1440), "24:00");
        assert_eq!(add_minutes("23:30", 30), "24:00");
        assert!(time_to_minutes(&minutes_to_time(1410)) < time_to_minutes(&minutes_to_time(1440)));
    }

    #[test]
    fn strict_parse_rejects_what_lenient_parse_zeroes() {
        assert_eq!(parse_time_strict("08:30"), Some(510));
        assert_eq!(parse_time_strict("8:30"), None);
        assert_eq!(parse_time_strict("24:00"), None);
        assert_eq!(parse_time_strict(""), None);
    }

    #[test]
    fn rounds_up_to_the_grid() {
        assert_eq!(round_up_to_step(600, 30), 600);
        assert_eq!(round_up_to_step(601, 30), 630);
        assert_eq!(round_up_to_step(629, 30), 630);
        assert_eq!(round_up_to_step(7, 0), 7);
    }

    #[test]
    fn day_of_week_starts_on_sunday() {
        // 2026-10-18 é um domingo.
        assert_eq!(day_of_week(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()), 0);
        assert_eq!(day_of_week(NaiveDate::from_ymd_opt(2026, 10, 24).unwrap()), 6);
    }

    #[test]
    fn civil_clock_ignores_the_machine_timezone() {
        // 02:30 UTC ainda é o dia anterior em São Paulo (UTC-3).
        let instant = Utc.with_ymd_and_hms(2026, 10, 20, 2, 30, 0).unwrap();
        let clock = CivilClock::frozen(chrono_tz::America::Sao_Paulo, instant);
        let (date, minutes) = clock.current_date_and_minutes();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(minutes, 23 * 60 + 30);
    }
}
