pub mod theme;
pub mod transport;

pub use theme::Theme;
pub use transport::{
    beat_lit, render_footer, render_header, render_tempo_input, render_transport, TempoInput,
    TransportInfo,
};
