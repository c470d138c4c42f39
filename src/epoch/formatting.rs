use crate::{
    epoch::ObservationEpoch,
    errors::FormattingError,
    header::Header,
    utils::{gregorian, sv_label},
};

use std::io::{BufWriter, Write};

impl ObservationEpoch {
    /// Formats this [ObservationEpoch] as a RINEX3 epoch record.
    /// Fields follow the observables [Header] declares for each constellation:
    /// our pseudo range, phase and signal strength land in their first
    /// matching code, other observables are left blank.
    pub fn format<W: Write>(
        &self,
        header: &Header,
        writer: &mut BufWriter<W>,
    ) -> Result<(), FormattingError> {
        let (y, m, d, hh, mm, ss) = gregorian(self.epoch);

        writeln!(
            writer,
            "> {:04} {:02} {:02} {:02} {:02} {:10.7}  {} {:2}",
            y,
            m,
            d,
            hh,
            mm,
            ss,
            self.flag.digit(),
            self.observations.len(),
        )?;

        for observation in self.observations.iter() {
            let map = header.field_map(observation.sv.constellation);
            let nb_fields = header
                .nb_observables(observation.sv.constellation)
                .max(2);

            let mut line = sv_label(observation.sv);

            for index in 0..nb_fields {
                let value = if map.pseudorange == Some(index) {
                    observation.pseudorange
                } else if map.phase == Some(index) {
                    observation.phase
                } else if map.signal_strength == Some(index) {
                    observation.signal_strength
                } else {
                    f64::NAN
                };

                if value.is_nan() {
                    line.push_str(&" ".repeat(16));
                } else {
                    line.push_str(&format!("{:14.3}  ", value));
                }
            }

            writeln!(writer, "{}", line.trim_end())?;
        }

        Ok(())
    }
}
