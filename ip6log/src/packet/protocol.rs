//! IP protocol numbers (IPv6 next-header values).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::protocol_constants;

protocol_constants!(
    IpProto, u8:
    HOPOPT = 0;
    TCP = 6;
    UDP = 17;
    IPV6_ROUTE = 43;
    IPV6_FRAG = 44;
    ESP = 50;
    AH = 51;
    IPV6_ICMP = 58;
    IPV6_NONXT = 59;
    IPV6_OPTS = 60;
    UDPLITE = 136;
);

impl IpProto {
    /// True for the header types that form the IPv6 extension chain.
    ///
    /// Note that no-next-header (59) is part of this set: the walker treats
    /// it as the end of the chain, everything else dispatches to transport.
    #[inline]
    pub fn is_ext_header(&self) -> bool {
        matches!(
            *self,
            IpProto::HOPOPT
                | IpProto::IPV6_ROUTE
                | IpProto::IPV6_FRAG
                | IpProto::ESP
                | IpProto::AH
                | IpProto::IPV6_NONXT
                | IpProto::IPV6_OPTS
        )
    }
}
