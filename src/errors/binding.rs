use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum BindingError {
    #[error("Finalizer for {} doesn't match the provided type {}", finalizer.name, target.name)]
    FinalizerTypeMismatch { target: TypeInfo, finalizer: TypeInfo },
    #[error(
        "Finalizer can't be attached to the transient binding for {}. \
        Transient instances aren't cached, so there is no release point for them",
        target.name,
    )]
    TransientFinalizer { target: TypeInfo },
}
