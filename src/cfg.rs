macro_rules! cfg_client {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "client")]
            #[cfg_attr(docsrs, doc(cfg(feature = "client")))]
            $item
        )*
    }
}

macro_rules! cfg_server {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "server")]
            #[cfg_attr(docsrs, doc(cfg(feature = "server")))]
            $item
        )*
    }
}

macro_rules! cfg_http1 {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "http1")]
            #[cfg_attr(docsrs, doc(cfg(feature = "http1")))]
            $item
        )*
    }
}

macro_rules! cfg_http2 {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "http2")]
            #[cfg_attr(docsrs, doc(cfg(feature = "http2")))]
            $item
        )*
    }
}
