mod test {
    use crate::{
        prelude::{
            Assembler, Constellation, Decoder, Duration, Epoch, EpochFlag, TimeScale, SV,
        },
        tests::toolkit::{
            generate_rinex3, millimeter, random_name, synthetic_epoch, synthetic_header,
        },
    };

    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn synthetic_rinex3() {
        let t0 = Epoch::from_gregorian(2022, 1, 5, 12, 0, 0, 0, TimeScale::GPST);
        let header = synthetic_header(t0, 30.0);

        let satellites = [
            SV::new(Constellation::GPS, 3),
            SV::new(Constellation::GPS, 17),
            SV::new(Constellation::GPS, 28),
            SV::new(Constellation::Galileo, 5),
            SV::new(Constellation::Galileo, 26),
        ];

        let mut epochs = Vec::with_capacity(300);
        let mut expected = BTreeMap::<SV, Vec<(f64, f64)>>::new();

        for i in 0..300 {
            // 10 minutes data gap
            if (100..120).contains(&i) {
                continue;
            }

            let elapsed_s = i as f64 * 30.0;

            let flag = if i % 37 == 5 {
                EpochFlag::PowerFailure
            } else {
                EpochFlag::Ok
            };

            let observations = satellites
                .iter()
                .enumerate()
                // GAL-26 rises late
                .filter(|(_, sv)| sv.prn != 26 || i >= 150)
                .map(|(nth, sv)| {
                    let pr = millimeter(
                        21.0E6 + nth as f64 * 7.5E5 + 120.0 * elapsed_s + (i as f64 / 7.0).sin(),
                    );
                    (*sv, pr)
                })
                .collect::<Vec<_>>();

            if flag == EpochFlag::Ok {
                for (sv, pr) in observations.iter() {
                    expected.entry(*sv).or_default().push((elapsed_s, *pr));
                }
            }

            epochs.push(synthetic_epoch(
                t0 + Duration::from_seconds(elapsed_s),
                flag,
                &observations,
            ));
        }

        let path = std::env::temp_dir().join(format!("{}.rnx", random_name(8)));
        let mut fd = File::create(&path).unwrap();
        fd.write_all(&generate_rinex3(&header, &epochs)).unwrap();
        drop(fd);

        let mut decoder = Decoder::from_file(&path).unwrap();

        let parsed = decoder.header().clone();
        assert_eq!(parsed.marker.as_deref(), Some("SYNTH"));
        assert_eq!(parsed.interval, Some(30.0));
        assert_eq!(parsed.time_of_first_obs, Some(t0));
        assert_eq!(parsed.nb_observables(Constellation::GPS), 4);
        assert_eq!(parsed.nb_observables(Constellation::Galileo), 3);

        let mut assembler = Assembler::from_header(&parsed);
        let mut nb_epochs = 0;
        for epoch in decoder.by_ref() {
            assert_eq!(epoch.epoch, epochs[nb_epochs].epoch);
            assert_eq!(epoch.flag, epochs[nb_epochs].flag);
            assert!(epoch.is_complete());
            nb_epochs += 1;
            assembler.consume(&epoch);
        }

        let _ = std::fs::remove_file(&path);

        assert_eq!(nb_epochs, epochs.len());
        assert_eq!(decoder.stats().malformed_lines, 0);
        assert_eq!(decoder.stats().short_records, 0);

        let series = assembler.finish();

        assert_eq!(series.t0, Some(t0));
        assert_eq!(series.gaps.len(), 1);
        assert_eq!(series.gaps[0].start_s, 99.0 * 30.0);
        assert_eq!(series.gaps[0].duration_s, 21.0 * 30.0);

        assert_eq!(series.len(), satellites.len());

        for (sv, pairs) in expected.iter() {
            let decoded = series.get(sv).unwrap();
            assert_eq!(decoded.len(), pairs.len(), "{:?}", sv);

            for (sample, (elapsed_s, pr)) in decoded.samples().iter().zip(pairs.iter()) {
                assert!((sample.elapsed_s - elapsed_s).abs() < 1.0E-6);
                assert!((sample.pseudorange - pr).abs() < 1.0E-6, "{:?}", sv);
                assert!(sample.phase.is_finite());
            }
        }
    }
}
