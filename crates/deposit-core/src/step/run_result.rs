/// Resultado de ejecutar un paso.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRunResult {
    /// El paso terminó; el cursor avanza.
    Success,
    /// Pausa explícita (p.ej. esperando un formulario). El cursor se queda en
    /// este paso y se vuelve a ejecutar al reanudar.
    Halt { hint: Option<String> },
    /// Fallo; no se persiste nada.
    Failure { message: String },
}

impl StepRunResult {
    pub fn halt(hint: impl Into<String>) -> Self {
        Self::Halt { hint: Some(hint.into()) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure { message: message.into() }
    }
}
