// UART pins per board. The DK routes these to the interface MCU's VCOM;
// the dongle variant expects an external USB-serial adapter.

#[cfg(feature = "dk")]
macro_rules! pinout {
    ($p:ident . uart_rx) => ($p.P0_08);
    ($p:ident . uart_tx) => ($p.P0_06);
}

#[cfg(feature = "dongle")]
macro_rules! pinout {
    ($p:ident . uart_rx) => ($p.P0_13);
    ($p:ident . uart_tx) => ($p.P0_15);
}
