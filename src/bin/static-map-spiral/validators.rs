use std::{fmt::Display, str::FromStr};

pub fn is_numeric_min(min: usize) -> impl Fn(String) -> Result<(), String> {
    move |v: String| {
        let val = v
            .parse::<usize>()
            .map_err(|_| "must be numeric".to_owned())?;

        if val < min {
            return Err(format!("must be >= {}", min));
        }

        Ok(())
    }
}

pub fn is_zoom(v: String) -> Result<(), String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;

    if val > 21 {
        return Err("must be <= 21".to_owned());
    }

    Ok(())
}

pub fn is_latitude(v: String) -> Result<(), String> {
    is_degrees(v, 90f64)
}

pub fn is_longitude(v: String) -> Result<(), String> {
    is_degrees(v, 180f64)
}

fn is_degrees(v: String, max: f64) -> Result<(), String> {
    let val = v.parse::<f64>().map_err(|_| "must be numeric".to_owned())?;

    if !(val >= -max && val <= max) {
        return Err(format!("must be within ±{}°", max));
    }

    Ok(())
}

pub fn is_distance(v: String) -> Result<(), String> {
    let val = v.parse::<f64>().map_err(|_| "must be numeric".to_owned())?;

    if !val.is_finite() {
        return Err("must be a finite number of kilometers".to_owned());
    }

    Ok(())
}

/// Accepts anything `T` can be parsed from.
pub fn parses_as<T>(v: String) -> Result<(), String>
where
    T: FromStr,
    T::Err: Display,
{
    v.parse::<T>().map(|_| ()).map_err(|e| e.to_string())
}
