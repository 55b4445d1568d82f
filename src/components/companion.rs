//! Backward-Euler companion models for energy-storage elements.
//!
//! For a step size `h`, each element is replaced by a conductance in
//! parallel with a current source that carries the previous step's state:
//!
//! ```text
//! capacitor:  i(n) = (C/h) * v(n) - (C/h) * v(n-1)
//! inductor:   i(n) = (h/L) * v(n) + i(n-1)
//! ```
//!
//! `i` is the current entering the positive terminal and `v` the voltage
//! from positive to negative.

/// Per-element history carried between time steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Companion {
    Capacitor {
        capacitance: f64,
        /// Voltage across the capacitor at the previous step
        v_prev: f64,
    },
    Inductor {
        inductance: f64,
        /// Current through the inductor at the previous step
        i_prev: f64,
    },
}

impl Companion {
    /// Uncharged capacitor.
    pub fn capacitor(capacitance: f64) -> Self {
        Self::Capacitor {
            capacitance,
            v_prev: 0.0,
        }
    }

    /// Inductor with zero initial current.
    pub fn inductor(inductance: f64) -> Self {
        Self::Inductor {
            inductance,
            i_prev: 0.0,
        }
    }

    /// Equivalent conductance for step size `h`.
    pub fn conductance(&self, h: f64) -> f64 {
        match *self {
            Self::Capacitor { capacitance, .. } => capacitance / h,
            Self::Inductor { inductance, .. } => h / inductance,
        }
    }

    /// History current injected into the positive terminal's net.
    ///
    /// The negative terminal's net receives the opposite amount.
    pub fn history_injection(&self, h: f64) -> f64 {
        match *self {
            Self::Capacitor { v_prev, .. } => self.conductance(h) * v_prev,
            Self::Inductor { i_prev, .. } => -i_prev,
        }
    }

    /// Current entering the positive terminal for a solved voltage `v`.
    pub fn current(&self, v: f64, h: f64) -> f64 {
        self.conductance(h) * v - self.history_injection(h)
    }

    /// Carry the solved step forward as history for the next one.
    pub fn update_state(&mut self, v_new: f64, h: f64) {
        let i_new = self.current(v_new, h);
        match self {
            Self::Capacitor { v_prev, .. } => *v_prev = v_new,
            Self::Inductor { i_prev, .. } => *i_prev = i_new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_capacitor_companion() {
        let mut cap = Companion::capacitor(1e-6);
        let h = 1e-3;
        assert_relative_eq!(cap.conductance(h), 1e-3);
        assert_relative_eq!(cap.history_injection(h), 0.0);

        cap.update_state(2.0, h);
        // G * v_prev
        assert_relative_eq!(cap.history_injection(h), 2e-3);
        // Holding the voltage draws no current
        assert_relative_eq!(cap.current(2.0, h), 0.0);
    }

    #[test]
    fn test_inductor_companion() {
        let mut ind = Companion::inductor(1e-3);
        let h = 1e-6;
        assert_relative_eq!(ind.conductance(h), 1e-3);

        ind.update_state(1.0, h);
        assert_relative_eq!(ind.current(0.0, h), 1e-3);
        ind.update_state(1.0, h);
        // Constant voltage ramps the current linearly: i = V*t/L
        assert_relative_eq!(ind.current(0.0, h), 2e-3);
        assert_relative_eq!(ind.history_injection(h), -2e-3);
    }
}
