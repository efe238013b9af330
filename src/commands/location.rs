//! Terminal rendition of the location selection screen.

use crate::app::{LocationSelector, LocationViewDto, Navigator, SelectOptionDto};
use crate::domain::{Locality, NavigationRequest, Region};
use crate::error::AppError;
use crate::infra::GeoSource;
use std::io::{BufRead, Write};

/// Prints the navigation request as one JSON line on stdout.
pub struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, request: &NavigationRequest) -> Result<(), AppError> {
        let json = serde_json::to_string(request).map_err(|e| AppError::Io(e.to_string()))?;
        println!("{}", json);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Index into the option list; 0 is the placeholder.
    Option(usize),
    Retry,
    Quit,
    Invalid,
}

pub fn parse_choice(line: &str, option_count: usize) -> Choice {
    match line.trim() {
        "" => Choice::Invalid,
        "q" | "Q" => Choice::Quit,
        "r" | "R" => Choice::Retry,
        s => match s.parse::<usize>() {
            Ok(i) if i < option_count => Choice::Option(i),
            _ => Choice::Invalid,
        },
    }
}

fn read_choice<R: BufRead>(input: &mut R, option_count: usize) -> Result<Choice, AppError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Choice::Quit);
    }
    Ok(parse_choice(&line, option_count))
}

fn render<W: Write>(out: &mut W, title: &str, options: &[SelectOptionDto]) -> Result<(), AppError> {
    writeln!(out, "{}", title)?;
    for (i, opt) in options.iter().enumerate() {
        writeln!(out, "  {:>3}) {}", i, opt.label)?;
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn picked(options: &[SelectOptionDto], index: usize) -> Option<String> {
    options.get(index).and_then(|o| o.value.clone())
}

fn cancelled() -> AppError {
    AppError::Validation("selection cancelled".into())
}

/// Walk the user through UF then city, then hand off to the navigator.
pub async fn cmd_location_select<S, R, W>(
    selector: &LocationSelector<S>,
    navigator: &dyn Navigator,
    mut input: R,
    mut out: W,
) -> Result<NavigationRequest, AppError>
where
    S: GeoSource + 'static,
    R: BufRead,
    W: Write,
{
    selector.load_regions().await?;

    loop {
        let view: LocationViewDto = selector.view()?;

        if let Some(err) = &view.regions_error {
            writeln!(out, "Could not load UFs: {}", err)?;
            write!(out, "[r]etry or [q]uit > ")?;
            out.flush()?;
            match read_choice(&mut input, 0)? {
                Choice::Retry => {
                    selector.load_regions().await?;
                }
                Choice::Quit => return Err(cancelled()),
                _ => {}
            }
            continue;
        }

        if view.selected_uf.is_none() {
            render(&mut out, "UF (q to quit)", &view.region_options)?;
            match read_choice(&mut input, view.region_options.len())? {
                Choice::Option(i) => {
                    selector
                        .select_region(picked(&view.region_options, i).map(Region))
                        .await?;
                }
                Choice::Quit => return Err(cancelled()),
                _ => writeln!(out, "Invalid choice")?,
            }
            continue;
        }

        if let Some(err) = &view.localities_error {
            writeln!(out, "Could not load cities: {}", err)?;
            write!(out, "[r]etry, 0 to change UF or [q]uit > ")?;
            out.flush()?;
            match read_choice(&mut input, 1)? {
                Choice::Retry => {
                    selector.retry_localities().await?;
                }
                Choice::Option(_) => {
                    selector.select_region(None).await?;
                }
                Choice::Quit => return Err(cancelled()),
                Choice::Invalid => {}
            }
            continue;
        }

        if view.selected_city.is_none() {
            let title = format!(
                "City in {} (0 to change UF, q to quit)",
                view.selected_uf.as_deref().unwrap_or_default()
            );
            render(&mut out, &title, &view.locality_options)?;
            match read_choice(&mut input, view.locality_options.len())? {
                Choice::Option(0) => {
                    selector.select_region(None).await?;
                }
                Choice::Option(i) => {
                    selector.select_locality(picked(&view.locality_options, i).map(Locality))?;
                }
                Choice::Quit => return Err(cancelled()),
                _ => writeln!(out, "Invalid choice")?,
            }
            continue;
        }

        break;
    }

    selector.proceed(navigator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_choice_accepts_indices_in_range() {
        assert_eq!(parse_choice("2\n", 3), Choice::Option(2));
        assert_eq!(parse_choice(" 0 ", 3), Choice::Option(0));
        assert_eq!(parse_choice("3", 3), Choice::Invalid);
    }

    #[test]
    fn parse_choice_commands() {
        assert_eq!(parse_choice("q", 1), Choice::Quit);
        assert_eq!(parse_choice("R", 1), Choice::Retry);
        assert_eq!(parse_choice("", 1), Choice::Invalid);
        assert_eq!(parse_choice("SP", 1), Choice::Invalid);
    }
}
