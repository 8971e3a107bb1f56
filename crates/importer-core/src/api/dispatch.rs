//! The three dispatched operations.

use crate::protocol::{CallEnvelope, Kwargs, Operation, Value};
use crate::{Importer, Mode, Result};
use tracing::debug;

impl Importer {
    /// Call `method` on `module` with positional and keyword arguments.
    ///
    /// `module` is either a namespace path or, locally, a variable created by
    /// [`instantiate`](Self::instantiate).
    pub fn call(
        &mut self,
        module: &str,
        method: &str,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<Value> {
        debug!("call {}.{} ({:?})", module, method, self.mode());
        match self.mode() {
            Mode::Local => self.scope.call(&self.config, module, method, args, kwargs),
            Mode::Remote => {
                let envelope = CallEnvelope::new(
                    Operation::Call,
                    module,
                    method,
                    args.to_vec(),
                    kwargs.clone(),
                );
                self.transport.perform(&self.config, &self.codecs, &envelope)
            }
        }
    }

    /// Read attribute `attr` of `module`.
    pub fn get(&mut self, module: &str, attr: &str) -> Result<Value> {
        debug!("get {}.{} ({:?})", module, attr, self.mode());
        match self.mode() {
            Mode::Local => self.scope.get(&self.config, module, attr),
            Mode::Remote => {
                let envelope =
                    CallEnvelope::new(Operation::Get, module, attr, Vec::new(), Kwargs::new());
                self.transport.perform(&self.config, &self.codecs, &envelope)
            }
        }
    }

    /// Construct `module.class(args, kwargs)` and keep it as `variable`.
    ///
    /// Locally this is idempotent per variable name, and `module` may name an
    /// existing variable to construct a member object from it. Remotely the
    /// exporter owns the scope and the reply body is ignored.
    pub fn instantiate(
        &mut self,
        variable: &str,
        module: &str,
        class: &str,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<()> {
        debug!(
            "instantiate {} = {}.{} ({:?})",
            variable,
            module,
            class,
            self.mode()
        );
        match self.mode() {
            Mode::Local => {
                self.scope
                    .instantiate(&self.config, variable, module, class, args, kwargs)
            }
            Mode::Remote => {
                let envelope = CallEnvelope::new(
                    Operation::Instantiate,
                    module,
                    class,
                    args.to_vec(),
                    kwargs.clone(),
                )
                .with_variable(variable);
                self.transport
                    .perform(&self.config, &self.codecs, &envelope)
                    .map(|_| ())
            }
        }
    }
}
