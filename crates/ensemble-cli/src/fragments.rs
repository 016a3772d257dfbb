//! Actor arguments on the command line.
//!
//! An actor is either raw fragment bits (`1029`, `0x405`) or a short form
//! `[race:]sex[+sub][+unc]` where sex is one of `m`, `f` or `h`.

use anyhow::{anyhow, bail, Context, Result};

use ensemble_core::fragment::{Fragment, RaceKey, Sex, Status};

pub fn parse(arg: &str) -> Result<Fragment> {
    if let Some(hex) = arg.strip_prefix("0x") {
        let bits = u16::from_str_radix(hex, 16).with_context(|| format!("bad bits {arg:?}"))?;
        return Ok(Fragment::from_bits(bits)?);
    }
    if let Ok(bits) = arg.parse::<u16>() {
        return Ok(Fragment::from_bits(bits)?);
    }

    let mut parts = arg.split('+');
    let head = parts.next().unwrap_or_default();
    let (race, sex) = match head.split_once(':') {
        Some((race, sex)) => (
            RaceKey::from_name(race).ok_or_else(|| anyhow!("unknown race {race:?}"))?,
            sex,
        ),
        None => (RaceKey::Human, head),
    };
    let sex = match sex.to_ascii_lowercase().as_str() {
        "m" => Sex::Male,
        "f" => Sex::Female,
        "h" => Sex::Futa,
        other => bail!("unknown sex {other:?} in {arg:?}"),
    };

    let mut status = Status::empty();
    for flag in parts {
        match flag {
            "sub" => status |= Status::SUBMISSIVE,
            "unc" => status |= Status::UNCONSCIOUS,
            other => bail!("unknown flag {other:?} in {arg:?}"),
        }
    }
    Ok(Fragment::creature(race, sex).with_status(status))
}
