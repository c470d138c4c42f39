use crate::{
    errors::FormattingError,
    header::Header,
    prelude::Constellation,
    utils::{constellation_letter, gregorian},
};

use itertools::Itertools;

use std::io::{BufWriter, Write};

/// Observable codes per `SYS / # / OBS TYPES` line
const CODES_PER_LINE: usize = 13;

fn write_labeled<W: Write>(
    writer: &mut BufWriter<W>,
    content: &str,
    label: &str,
) -> Result<(), FormattingError> {
    writeln!(writer, "{:<60}{}", content, label)?;
    Ok(())
}

impl Header {
    /// Formats this [Header] as a RINEX3 observation header,
    /// whatever revision it was parsed from.
    pub fn format<W: Write>(&self, writer: &mut BufWriter<W>) -> Result<(), FormattingError> {
        let letter = match self.constellation {
            Some(constellation) => constellation_letter(constellation),
            None => 'M',
        };

        write_labeled(
            writer,
            &format!(
                "{:>9}{:11}{:<20}{:<20}",
                self.version.to_string(),
                "",
                "OBSERVATION DATA",
                letter
            ),
            "RINEX VERSION / TYPE",
        )?;

        for comment in self.comments.iter() {
            write_labeled(writer, comment, "COMMENT")?;
        }

        if let Some(marker) = &self.marker {
            write_labeled(writer, marker, "MARKER NAME")?;
        }

        if let Some(position) = &self.position {
            write_labeled(
                writer,
                &format!("{:14.4}{:14.4}{:14.4}", position.x, position.y, position.z),
                "APPROX POSITION XYZ",
            )?;
        }

        // sorted for reproducible output
        let systems = self
            .observables
            .iter()
            .sorted_by_key(|(constellation, _)| constellation_letter(**constellation))
            .collect::<Vec<(&Constellation, &Vec<String>)>>();

        for (constellation, codes) in systems {
            for (nth, chunk) in codes.chunks(CODES_PER_LINE).enumerate() {
                let head = if nth == 0 {
                    format!("{}  {:3}", constellation_letter(*constellation), codes.len())
                } else {
                    " ".repeat(6)
                };

                let body = chunk.iter().map(|code| format!(" {:>3}", code)).join("");
                write_labeled(writer, &format!("{}{}", head, body), "SYS / # / OBS TYPES")?;
            }
        }

        if let Some(interval) = self.interval {
            write_labeled(writer, &format!("{:10.3}", interval), "INTERVAL")?;
        }

        if let Some(t) = self.time_of_first_obs {
            let (y, m, d, hh, mm, ss) = gregorian(t);
            write_labeled(
                writer,
                &format!(
                    "{:6}{:6}{:6}{:6}{:6}{:13.7}{:5}{:<3}",
                    y, m, d, hh, mm, ss, "", self.time_system
                ),
                "TIME OF FIRST OBS",
            )?;
        }

        write_labeled(writer, "", "END OF HEADER")?;
        Ok(())
    }
}
