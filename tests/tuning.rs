use eswin_sdhci::{
    SdError, SdhciVariant, SdioVariant, TuningOps, TuningOutcome,
    sdio::constant::{DELAY_RANGE_THRESHOLD, MMC_SEND_TUNING_BLOCK, PHY_DELAY_CODE_MAX},
    tuning::{SoftwareTuningPolicy, TuningRange, delay_code_tuning, issue_tuning_probe, phase_code_tuning},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    ClockOff,
    ClockOn,
    Delay(u8),
    Phase(u16),
    Arm,
    ClearCmdData,
    Probe { delay: u8, phase: u16 },
    Reset,
}

/// Controller double answering tuning probes from an oracle over (delay, phase).
struct MockHost {
    oracle: Box<dyn Fn(u8, u16) -> bool>,
    delay: u8,
    phase: u16,
    clock_on: bool,
    events: Vec<Event>,
}

impl MockHost {
    fn new(oracle: impl Fn(u8, u16) -> bool + 'static) -> Self {
        Self {
            oracle: Box::new(oracle),
            delay: 0,
            phase: 0,
            clock_on: true,
            events: Vec::new(),
        }
    }

    fn delay_probes(&self) -> Vec<u8> {
        self.events
            .windows(2)
            .filter_map(|pair| match pair {
                [Event::Delay(code), Event::ClockOn] => Some(*code),
                _ => None,
            })
            .collect()
    }

    fn probes(&self) -> Vec<(u8, u16)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Probe { delay, phase } => Some((*delay, *phase)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

impl TuningOps for MockHost {
    fn host_id(&self) -> u32 {
        0
    }

    fn disable_card_clk(&mut self) {
        self.clock_on = false;
        self.events.push(Event::ClockOff);
    }

    fn enable_card_clk(&mut self) {
        self.clock_on = true;
        self.events.push(Event::ClockOn);
    }

    fn config_phy_delay(&mut self, delay: u8) {
        assert!(!self.clock_on, "delay line written with the card clock running");
        self.delay = delay;
        self.events.push(Event::Delay(delay));
    }

    fn write_phase_code(&mut self, code: u16) {
        assert!(!self.clock_on, "phase register written with the card clock running");
        self.phase = code;
        self.events.push(Event::Phase(code));
    }

    fn arm_sw_tuning(&mut self) {
        self.events.push(Event::Arm);
    }

    fn clear_cmd_data(&mut self) {
        self.events.push(Event::ClearCmdData);
    }

    fn send_tuning(&mut self, _opcode: u8) -> Result<(), SdError> {
        self.events.push(Event::Probe {
            delay: self.delay,
            phase: self.phase,
        });
        if (self.oracle)(self.delay, self.phase) {
            Ok(())
        } else {
            Err(SdError::DataCrc)
        }
    }

    fn reset_cmd_data(&mut self) {
        self.events.push(Event::Reset);
    }
}

const OPCODE: u8 = MMC_SEND_TUNING_BLOCK;

#[test]
fn failed_probe_resets_cmd_and_data() {
    let mut host = MockHost::new(|_, _| false);
    assert_eq!(issue_tuning_probe(&mut host, OPCODE), Err(SdError::DataCrc));
    assert_eq!(host.events.last(), Some(&Event::Reset));

    let mut host = MockHost::new(|_, _| true);
    assert_eq!(issue_tuning_probe(&mut host, OPCODE), Ok(()));
    assert_eq!(host.count(|e| *e == Event::Reset), 0);
}

#[test]
fn delay_commits_midpoint_of_single_window() {
    let mut host = MockHost::new(|delay, _| (30..=45).contains(&delay));

    assert_eq!(delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 5), Ok(37));
    assert_eq!(host.delay, 37);
    assert!(host.clock_on);
}

#[test]
fn delay_prefers_wider_window() {
    // [10, 14] is width 4, [60, 75] is width 15; neither exceeds the threshold
    let mut host = MockHost::new(|delay, _| (10..=14).contains(&delay) || (60..=75).contains(&delay));

    assert_eq!(delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 5), Ok(67));
    assert_eq!(host.delay, 67);
    // no early exit, so the whole line was swept
    assert_eq!(host.probes().len(), PHY_DELAY_CODE_MAX as usize + 1);
}

#[test]
fn delay_keeps_first_of_equal_windows() {
    let mut host = MockHost::new(|delay, _| (10..=15).contains(&delay) || (40..=45).contains(&delay));

    assert_eq!(delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 5), Ok(12));
}

#[test]
fn delay_stops_after_wide_window() {
    let end = 5 + DELAY_RANGE_THRESHOLD + 1;
    let mut host = MockHost::new(move |delay, _| (5..=end).contains(&delay) || delay >= 60);

    assert_eq!(delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 0), Ok((5 + end) / 2));

    // the failing probe right after the window is the last one
    let probed = host.probes();
    assert_eq!(probed.last(), Some(&(end + 1, 0)));
    assert_eq!(probed.len(), end as usize + 2);
}

#[test]
fn delay_window_at_threshold_does_not_stop() {
    let end = 5 + DELAY_RANGE_THRESHOLD;
    let mut host = MockHost::new(move |delay, _| (5..=end).contains(&delay));

    assert_eq!(delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 0), Ok((5 + end) / 2));
    assert_eq!(host.probes().len(), PHY_DELAY_CODE_MAX as usize + 1);
}

#[test]
fn delay_ignores_window_reaching_end_of_line() {
    let mut host = MockHost::new(|delay, _| delay >= 100);

    assert_eq!(
        delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 0x11),
        Err(SdError::DelayTuningFailed)
    );
    assert_eq!(host.delay, 0x11);
}

#[test]
fn delay_ignores_single_code_windows() {
    let mut host = MockHost::new(|delay, _| delay % 2 == 0);

    assert_eq!(
        delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 0x08),
        Err(SdError::DelayTuningFailed)
    );
    assert_eq!(host.delay, 0x08);
}

#[test]
fn delay_all_fail_restores_fallback() {
    let mut host = MockHost::new(|_, _| false);

    assert_eq!(
        delay_code_tuning(&mut host, OPCODE, PHY_DELAY_CODE_MAX, 0x2a),
        Err(SdError::DelayTuningFailed)
    );
    assert_eq!(host.delay, 0x2a);
    assert_eq!(host.count(|e| *e == Event::Reset), PHY_DELAY_CODE_MAX as usize + 1);
    assert!(host.clock_on);
}

#[test]
fn delay_sweep_gates_clock_around_every_write() {
    let mut host = MockHost::new(|delay, _| (3..=9).contains(&delay));
    delay_code_tuning(&mut host, OPCODE, 15, 0).unwrap();

    assert_eq!(host.delay_probes(), (0..=15).chain([6]).collect::<Vec<u8>>());
    for (i, event) in host.events.iter().enumerate() {
        if let Event::Delay(_) = event {
            assert_eq!(host.events[i - 1], Event::ClockOff);
            assert_eq!(host.events[i + 1], Event::ClockOn);
        }
    }
}

#[test]
fn phase_scenario_stops_at_bounding_failure() {
    let mut host = MockHost::new(|_, phase| (2..=4).contains(&phase));

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 5), Ok(3));
    let phases: Vec<u16> = host.probes().iter().map(|(_, phase)| *phase).collect();
    assert_eq!(phases, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(host.phase, 3);
}

#[test]
fn phase_takes_first_window_even_if_narrower() {
    let mut host = MockHost::new(|_, phase| (10..=12).contains(&phase) || (100..=200).contains(&phase));

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 0xff), Ok(11));
    // stopped on the failure at 13
    assert_eq!(host.probes().last(), Some(&(0, 13)));
}

#[test]
fn phase_discards_single_code_window() {
    let mut host = MockHost::new(|_, phase| phase == 4 || (8..=11).contains(&phase));

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 0xff), Ok(9));
}

#[test]
fn phase_window_reaching_end_is_accepted() {
    let mut host = MockHost::new(|_, phase| phase >= 250);

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 0xff), Ok(252));
}

#[test]
fn phase_window_at_top_of_wide_range() {
    let mut host = MockHost::new(|_, phase| phase >= 0x8000);

    assert_eq!(phase_code_tuning(&mut host, OPCODE, u16::MAX), Ok(0xbfff));
    assert_eq!(host.phase, 0xbfff);
}

#[test]
fn phase_single_pass_at_end_fails() {
    let mut host = MockHost::new(|_, phase| phase == 0xff);

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 0xff), Err(SdError::PhaseTuningFailed));
    assert_eq!(host.phase, 0);
}

#[test]
fn phase_all_fail_programs_zero() {
    let mut host = MockHost::new(|_, _| false);
    host.phase = 0x33;

    assert_eq!(phase_code_tuning(&mut host, OPCODE, 0xff), Err(SdError::PhaseTuningFailed));
    assert_eq!(host.phase, 0);
    assert_eq!(host.events.last(), Some(&Event::ClockOn));
}

fn auto_variant(fallback: u8) -> SdioVariant {
    SdioVariant::new(
        SoftwareTuningPolicy {
            enabled: true,
            static_phase_code: Some(0x77),
        },
        fallback,
    )
}

#[test]
fn auto_tunes_delay_then_phase() {
    // phase 0 passes so the delay sweep sees a window; alone it is too narrow to win the phase sweep
    let mut host =
        MockHost::new(|delay, phase| (40..=60).contains(&delay) && (phase == 0 || (20..=30).contains(&phase)));

    let outcome = auto_variant(0).platform_execute_tuning(&mut host, OPCODE);
    assert_eq!(outcome, Ok(TuningOutcome::Tuned { delay: 50, phase: 25 }));

    assert_eq!(
        &host.events[..6],
        &[
            Event::ClockOff,
            Event::Arm,
            Event::Phase(0),
            Event::ClockOn,
            Event::ClearCmdData,
            Event::ClockOff,
        ]
    );
    // the whole delay sweep runs with the phase register at 0
    let probes = host.probes();
    assert!(probes[..PHY_DELAY_CODE_MAX as usize + 1].iter().all(|(_, phase)| *phase == 0));
    assert_eq!((host.delay, host.phase), (50, 25));
}

#[test]
fn auto_skips_phase_after_delay_failure() {
    let mut host = MockHost::new(|_, _| false);

    let outcome = auto_variant(0x19).platform_execute_tuning(&mut host, OPCODE);
    assert_eq!(outcome, Err(SdError::DelayTuningFailed));
    assert_eq!(outcome.unwrap_err().errno(), -5);

    // only the reset of the phase register at start, never a sweep
    assert_eq!(host.count(|e| matches!(e, Event::Phase(_))), 1);
    assert_eq!(host.probes().len(), PHY_DELAY_CODE_MAX as usize + 1);
    assert_eq!(host.delay, 0x19);
}

#[test]
fn auto_reports_phase_failure() {
    let mut host = MockHost::new(|delay, phase| (10..=20).contains(&delay) && phase == 0);

    let outcome = auto_variant(0).platform_execute_tuning(&mut host, OPCODE);
    assert_eq!(outcome, Err(SdError::PhaseTuningFailed));
    assert_eq!(host.delay, 15);
    assert_eq!(host.phase, 0);
}

#[test]
fn static_policy_writes_phase_once_without_probing() {
    let variant = SdioVariant::new(
        SoftwareTuningPolicy {
            enabled: false,
            static_phase_code: Some(0x3c),
        },
        0,
    );
    let mut host = MockHost::new(|_, _| true);

    assert_eq!(
        variant.platform_execute_tuning(&mut host, OPCODE),
        Ok(TuningOutcome::Static { phase: Some(0x3c) })
    );
    assert_eq!(host.events, vec![Event::ClockOff, Event::Phase(0x3c), Event::ClockOn]);
}

#[test]
fn static_policy_without_phase_does_nothing() {
    let variant = SdioVariant::new(SoftwareTuningPolicy::default(), 0);
    let mut host = MockHost::new(|_, _| true);

    assert_eq!(
        variant.platform_execute_tuning(&mut host, OPCODE),
        Ok(TuningOutcome::Static { phase: None })
    );
    assert!(host.events.is_empty());
}

#[test]
fn narrowed_range_bounds_both_sweeps() {
    let variant = auto_variant(0).with_range(TuningRange {
        delay_max: 15,
        phase_max: 7,
    });
    let mut host =
        MockHost::new(|delay, phase| (2..=8).contains(&delay) && (phase == 0 || (3..=5).contains(&phase)));

    assert_eq!(
        variant.platform_execute_tuning(&mut host, OPCODE),
        Ok(TuningOutcome::Tuned { delay: 5, phase: 4 })
    );
    assert!(host.probes().iter().all(|(delay, phase)| *delay <= 15 && *phase <= 7));
}
