//! Real-time clock
//!
//! The processor's line clock, serviced off the event queue at a
//! configurable rate (60Hz by default). Each tick latches the clock
//! flag; when the APR's clock enable is set the tick also raises the
//! clock's interrupt assignment.

use crate::cpu::state::{Cpu, RTC_QUANTUM};
use crate::events::EventTarget;

impl Cpu {
    /// One clock tick; reschedules itself
    pub fn rtc_service(&mut self) {
        self.apr.clk_flg = true;
        if self.apr.clk_en {
            let lvl = self.apr.clk_irq;
            self.set_interrupt(4, lvl);
        }
        self.events.schedule(EventTarget::Clock, RTC_QUANTUM);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::cpu::state::Cpu;

    #[test]
    fn test_tick_sets_flag() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        assert!(!c.apr.clk_flg);
        c.rtc_service();
        assert!(c.apr.clk_flg);
    }

    #[test]
    fn test_tick_interrupts_when_enabled() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.pi.enable = true;
        c.pi.pie = 0o177;
        c.apr.clk_en = true;
        c.apr.clk_irq = 5;
        c.rtc_service();
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 5);
    }

    #[test]
    fn test_tick_reschedules() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.events.clear();
        c.rtc_service();
        assert!(c
            .events
            .is_scheduled(crate::events::EventTarget::Clock));
    }
}
