pub mod error_envelope_mapper;
