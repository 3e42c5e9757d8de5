/// Resultado de `run_next_step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAdvance {
    /// Un paso terminó; `step` es el nuevo cursor.
    Advanced { step: usize },
    /// El paso en `step` pidió una pausa; el cursor no se movió.
    Halted { step: usize, hint: Option<String> },
    /// Transición terminal: se marcó `break` y el workflow quedó terminado.
    Completed,
    /// Ya estaba terminado; no se hizo nada.
    AlreadyComplete,
}

/// Resultado de `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Se detuvo en una pausa explícita.
    Halted { step: usize, hint: Option<String> },
    /// Recorrió el registro hasta el final.
    Completed,
    /// El contador de finalización ya superaba 1; no se ejecutó nada.
    AlreadyFinished,
}
